use criterion::{Criterion, black_box, criterion_group, criterion_main};
use geo_types::Coord;
use image::DynamicImage;
use nalgebra as na;
use template_pose::blob::{DetectorConfig, approximate_closed_polygon, extract_blob};
use template_pose::camera::CameraParams;
use template_pose::correspondence::extremum_offset;
use template_pose::synthetic::{house_template, render_target};
use template_pose::types::Pose;

fn bench_extremum_offset(c: &mut Criterion) {
    let points = house_template().vertices;
    let center = glam::Vec2::new(0.0, 100.0);
    c.bench_function("extremum_offset", |b| {
        b.iter(|| extremum_offset(black_box(&points), black_box(center)))
    });
}

fn bench_approximate_closed_polygon(c: &mut Criterion) {
    let ring: Vec<Coord<f64>> = (0..2000)
        .map(|i| {
            let t = i as f64 / 2000.0 * std::f64::consts::TAU;
            let r = 200.0 + 20.0 * (5.0 * t).cos().signum();
            Coord {
                x: r * t.cos(),
                y: r * t.sin(),
            }
        })
        .collect();
    c.bench_function("approximate_closed_polygon", |b| {
        b.iter(|| approximate_closed_polygon(black_box(&ring), 5.0))
    });
}

fn bench_extract_blob(c: &mut Criterion) {
    let camera = CameraParams::pinhole(800.0, 800.0, 400.0, 300.0);
    let pose = Pose::new(
        na::Vector3::new(0.1, -0.1, 0.2),
        na::Vector3::new(0.0, 0.0, 0.25),
    );
    let object = house_template().object_points(10000.0).unwrap();
    let image = DynamicImage::ImageRgb8(render_target(&camera, &pose, &object, 800, 600).unwrap());
    let config = DetectorConfig::default();
    c.bench_function("extract_blob", |b| {
        b.iter(|| extract_blob(black_box(&image), 5, &config))
    });
}

criterion_group!(
    benches,
    bench_extremum_offset,
    bench_approximate_closed_polygon,
    bench_extract_blob
);
criterion_main!(benches);
