use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use nalgebra as na;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rerun::RecordingStream;
use std::io::Cursor;

use crate::camera::CameraParams;
use crate::detected_points::{FeaturePoint, zip_features};
use crate::error::{PoseError, Result};
use crate::pipeline::PoseReport;
use crate::types::Pose;

/// Axis length in object units used by the CLI overlay.
pub const DEFAULT_AXIS_LENGTH: f64 = 0.01;

fn vis_err(e: impl std::fmt::Display) -> PoseError {
    PoseError::Visualization(e.to_string())
}

pub fn id_to_color(id: usize) -> (u8, u8, u8, u8) {
    let mut rng = ChaCha8Rng::seed_from_u64(id as u64);
    let color_num = rng.random_range(0..2u32.pow(24));
    (
        ((color_num >> 16) % 256) as u8,
        ((color_num >> 8) % 256) as u8,
        (color_num % 256) as u8,
        255,
    )
}

/// rerun use top left corner as (0, 0)
pub fn rerun_shift(p2ds: &[(f32, f32)]) -> Vec<(f32, f32)> {
    p2ds.iter().map(|(x, y)| (*x + 0.5, *y + 0.5)).collect()
}

fn draw_thick_line(canvas: &mut RgbImage, start: (f32, f32), end: (f32, f32), color: Rgb<u8>) {
    for (dx, dy) in [(0.0, 0.0), (1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)] {
        draw_line_segment_mut(
            canvas,
            (start.0 + dx, start.1 + dy),
            (end.0 + dx, end.1 + dy),
            color,
        );
    }
}

/// Draws the object frame axes (x red, y green, z blue) at `pose`.
pub fn draw_pose_axes(
    canvas: &mut RgbImage,
    camera: &CameraParams,
    pose: &Pose,
    axis_length: f64,
) -> Result<()> {
    let project = |p: na::Vector3<f64>| {
        camera
            .project_one(&pose.transform_point(&p))
            .map(|uv| (uv.x as f32, uv.y as f32))
            .ok_or_else(|| vis_err("pose axes project behind the camera"))
    };
    let origin = project(na::Vector3::zeros())?;
    let axes = [
        (na::Vector3::x() * axis_length, Rgb([255, 0, 0])),
        (na::Vector3::y() * axis_length, Rgb([0, 255, 0])),
        (na::Vector3::z() * axis_length, Rgb([0, 0, 255])),
    ];
    for (tip, color) in axes {
        draw_thick_line(canvas, origin, project(tip)?, color);
    }
    Ok(())
}

/// Marks the matched image vertices, coloured by template index.
pub fn draw_features(canvas: &mut RgbImage, features: &[FeaturePoint]) {
    for (i, f) in features.iter().enumerate() {
        let (r, g, b, _) = id_to_color(i);
        draw_filled_circle_mut(
            canvas,
            (f.p2d.x.round() as i32, f.p2d.y.round() as i32),
            4,
            Rgb([r, g, b]),
        );
    }
}

/// Input image with the matched vertices and pose axes drawn on top.
pub fn render_overlay(
    image: &DynamicImage,
    camera: &CameraParams,
    report: &PoseReport,
    axis_length: f64,
) -> Result<RgbImage> {
    let mut canvas = image.to_rgb8();
    draw_features(
        &mut canvas,
        &zip_features(&report.image_points, &report.object_points),
    );
    draw_pose_axes(&mut canvas, camera, &report.pose, axis_length)?;
    Ok(canvas)
}

pub fn log_image_as_compressed(
    recording: &RecordingStream,
    topic: &str,
    img: &RgbImage,
    format: image::ImageFormat,
) -> Result<()> {
    let mut bytes: Vec<u8> = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), format)?;
    recording
        .log(
            format!("{}/image", topic),
            &rerun::EncodedImage::from_file_contents(bytes),
        )
        .map_err(vis_err)
}

pub fn log_features(
    recording: &RecordingStream,
    topic: &str,
    features: &[FeaturePoint],
) -> Result<()> {
    let (pts, colors_labels): (Vec<_>, Vec<_>) = features
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let color = id_to_color(i);
            ((p.p2d.x, p.p2d.y), (color, format!("{}: {:?}", i, p.p3d)))
        })
        .unzip();
    let (colors, labels): (Vec<_>, Vec<_>) = colors_labels.into_iter().unzip();
    let pts = rerun_shift(&pts);
    recording
        .log(
            format!("{}/pts", topic),
            &rerun::Points2D::new(pts)
                .with_colors(colors)
                .with_labels(labels)
                .with_radii([rerun::Radius::new_ui_points(5.0)]),
        )
        .map_err(vis_err)
}

/// Opens a rerun viewer with the overlay and blocks until Enter is pressed.
pub fn show_overlay(overlay: &RgbImage, report: &PoseReport) -> Result<()> {
    let recording = rerun::RecordingStreamBuilder::new("template_pose")
        .spawn()
        .map_err(vis_err)?;
    let topic = "/cam0";
    log_image_as_compressed(&recording, topic, overlay, image::ImageFormat::Png)?;
    log_features(
        &recording,
        topic,
        &zip_features(&report.image_points, &report.object_points),
    )?;
    println!("Press Enter to close the viewer session");
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .map_err(|e| PoseError::io("<stdin>", e))?;
    Ok(())
}
