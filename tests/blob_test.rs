use geo_types::Coord;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use nalgebra as na;
use template_pose::PoseError;
use template_pose::blob::{
    DetectorConfig, adjust_contrast, approximate_closed_polygon, extract_blob,
    gaussian_kernel_3x3, refine_corners, select_largest,
};
use template_pose::camera::CameraParams;
use template_pose::synthetic::{house_template, project_points, render_target};
use template_pose::types::Pose;

fn square_ring(side: i32) -> Vec<Coord<f64>> {
    let mut points = Vec::new();
    for x in 0..side {
        points.push((x, 0));
    }
    for y in 0..side {
        points.push((side, y));
    }
    for x in (1..=side).rev() {
        points.push((x, side));
    }
    for y in (1..=side).rev() {
        points.push((0, y));
    }
    points
        .into_iter()
        .map(|(x, y)| Coord {
            x: x as f64,
            y: y as f64,
        })
        .collect()
}

#[test]
fn test_approximate_square() {
    let approx = approximate_closed_polygon(&square_ring(100), 5.0);
    assert_eq!(approx.len(), 4);
    for corner in [(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 100.0)] {
        assert!(
            approx.contains(&Coord {
                x: corner.0,
                y: corner.1
            }),
            "{:?}",
            approx
        );
    }
}

#[test]
fn test_select_largest_prefers_first_on_tie() {
    let square = |offset: f64, side: f64| {
        vec![
            Coord { x: offset, y: 0.0 },
            Coord {
                x: offset + side,
                y: 0.0,
            },
            Coord {
                x: offset + side,
                y: side,
            },
            Coord { x: offset, y: side },
        ]
    };
    let triangle = vec![
        Coord { x: 0.0, y: 0.0 },
        Coord { x: 500.0, y: 0.0 },
        Coord { x: 0.0, y: 500.0 },
    ];
    let candidates = vec![triangle, square(0.0, 10.0), square(50.0, 10.0), square(0.0, 5.0)];
    let (idx, area) = select_largest(&candidates, 4).unwrap();
    assert_eq!(idx, 1);
    assert!((area - 100.0).abs() < 1e-9);
    assert!(select_largest(&candidates, 6).is_none());
}

#[test]
fn test_adjust_contrast_saturates() {
    let mut gray = GrayImage::new(2, 1);
    gray.put_pixel(0, 0, Luma([100]));
    gray.put_pixel(1, 0, Luma([200]));
    let out = adjust_contrast(&gray, 2.0, 0.0);
    assert_eq!(out.get_pixel(0, 0)[0], 200);
    assert_eq!(out.get_pixel(1, 0)[0], 255);
}

#[test]
fn test_black_image_has_no_match() {
    let image = DynamicImage::ImageRgb8(RgbImage::new(320, 240));
    let result = extract_blob(&image, 5, &DetectorConfig::default());
    assert!(matches!(
        result,
        Err(PoseError::NoMatch { expected: 5, .. })
    ));
}

#[test]
fn test_largest_rectangle_wins() {
    let mut canvas = RgbImage::new(640, 480);
    draw_filled_rect_mut(&mut canvas, Rect::at(60, 80).of_size(240, 160), Rgb([255, 255, 255]));
    draw_filled_rect_mut(&mut canvas, Rect::at(420, 300).of_size(100, 70), Rgb([255, 255, 255]));
    let image = DynamicImage::ImageRgb8(canvas);

    let blob = extract_blob(&image, 4, &DetectorConfig::default()).unwrap();
    assert_eq!(blob.vertices.len(), 4);
    assert!(blob.area > 240.0 * 160.0 * 0.9, "area {}", blob.area);
    assert!((blob.center.x - 180.0).abs() < 4.0, "{:?}", blob.center);
    assert!((blob.center.y - 160.0).abs() < 4.0, "{:?}", blob.center);
    assert!(blob.contours_inspected >= 2);
}

#[test]
fn test_detector_config_validation() {
    assert!(DetectorConfig::default().validate().is_ok());
    let config = DetectorConfig {
        blur_sigma: 0.0,
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(PoseError::Config(_))));
    let config = DetectorConfig {
        canny_low: 400.0,
        ..Default::default()
    };
    assert!(matches!(config.validate(), Err(PoseError::Config(_))));
}

#[test]
fn test_detector_config_partial_json() {
    let config: DetectorConfig = serde_json::from_str(r#"{"dilation_radius": 2}"#).unwrap();
    assert_eq!(config.dilation_radius, 2);
    assert_eq!(config.canny_high, DetectorConfig::default().canny_high);
}

#[test]
fn test_gaussian_kernel_3x3() {
    let kernel = gaussian_kernel_3x3(1.0);
    assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    assert!((kernel[4] - 0.20418).abs() < 1e-4, "{:?}", kernel);
    assert!((kernel[0] - kernel[8]).abs() < 1e-7);
    assert!(kernel[1] > kernel[0] && kernel[4] > kernel[1]);
}

fn rectangle_edges() -> GrayImage {
    let mut edges = GrayImage::new(200, 160);
    for x in 50..=150 {
        edges.put_pixel(x, 40, Luma([255]));
        edges.put_pixel(x, 120, Luma([255]));
    }
    for y in 40..=120 {
        edges.put_pixel(50, y, Luma([255]));
        edges.put_pixel(150, y, Luma([255]));
    }
    edges
}

#[test]
fn test_refine_corners_snaps_to_edge_lines() {
    let coarse = [(46.0, 36.0), (154.0, 36.0), (154.0, 124.0), (46.0, 124.0)]
        .map(|(x, y)| Coord { x, y });
    let refined = refine_corners(&rectangle_edges(), &coarse, 6.0);
    let expected = [(50.0, 40.0), (150.0, 40.0), (150.0, 120.0), (50.0, 120.0)];
    for (r, (x, y)) in refined.iter().zip(expected) {
        assert!((r.x - x).abs() < 1e-6 && (r.y - y).abs() < 1e-6, "{:?}", refined);
    }
}

#[test]
fn test_refine_corners_without_edges_keeps_vertices() {
    let coarse = vec![
        Coord { x: 46.0, y: 36.0 },
        Coord { x: 154.0, y: 36.0 },
        Coord { x: 100.0, y: 124.0 },
    ];
    let refined = refine_corners(&GrayImage::new(200, 160), &coarse, 6.0);
    assert_eq!(refined, coarse);
}

#[test]
fn test_rendered_house_vertices_are_sub_pixel() {
    let camera = CameraParams::pinhole(800.0, 800.0, 400.0, 300.0);
    let pose = Pose::new(
        na::Vector3::new(0.1, -0.15, 0.05),
        na::Vector3::new(0.0, 0.0, 0.25),
    );
    let object_points = house_template().object_points(10000.0).unwrap();
    let truth = project_points(&camera, &pose, &object_points).unwrap();
    let image = DynamicImage::ImageRgb8(
        render_target(&camera, &pose, &object_points, 800, 600).unwrap(),
    );

    let blob = extract_blob(&image, 5, &DetectorConfig::default()).unwrap();
    assert_eq!(blob.vertices.len(), 5);
    for t in &truth {
        let nearest = blob
            .vertices
            .iter()
            .map(|v| v.distance(*t))
            .fold(f32::INFINITY, f32::min);
        assert!(nearest < 2.0, "{:?} is {} px from {:?}", t, nearest, blob.vertices);
    }
}
