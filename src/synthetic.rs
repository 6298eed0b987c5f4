//! Rendered targets with a known pose, used by `tpose-synth` and the tests.

use std::path::Path;

use image::imageops::FilterType;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use nalgebra as na;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::camera::CameraParams;
use crate::error::{PoseError, Result};
use crate::io::object_to_json;
use crate::template::Template;
use crate::types::Pose;

/// House outline in SVG units, y down, in the order the aligner produces:
/// bottom left, top left, apex, top right, bottom right.
///
/// The walls lean inwards so the lines through them meet far above the apex.
pub fn house_template() -> Template {
    Template::new(vec![
        glam::Vec2::new(-400.0, 500.0),
        glam::Vec2::new(-300.0, -100.0),
        glam::Vec2::new(0.0, -300.0),
        glam::Vec2::new(300.0, -100.0),
        glam::Vec2::new(400.0, 500.0),
    ])
}

/// Single `polygon` SVG document for `template`.
pub fn template_to_svg(template: &Template) -> String {
    let points = template
        .vertices
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"-500 -500 1000 1000\">\n  \
         <polygon points=\"{points}\" fill=\"white\"/>\n\
         </svg>\n"
    )
}

pub fn project_points(
    camera: &CameraParams,
    pose: &Pose,
    object_points: &[glam::Vec3],
) -> Result<Vec<glam::Vec2>> {
    object_points
        .iter()
        .map(|p| {
            let p = na::Vector3::new(p.x as f64, p.y as f64, p.z as f64);
            camera
                .project_one(&pose.transform_point(&p))
                .map(|uv| glam::Vec2::new(uv.x as f32, uv.y as f32))
                .ok_or_else(|| {
                    PoseError::GeometryDegenerate("target point behind the camera".to_string())
                })
        })
        .collect()
}

const SUPERSAMPLING: u32 = 4;

/// White filled target on a black background.
///
/// Drawn at 4x resolution and downsampled so the edges carry sub-pixel
/// position.
pub fn render_target(
    camera: &CameraParams,
    pose: &Pose,
    object_points: &[glam::Vec3],
    width: u32,
    height: u32,
) -> Result<RgbImage> {
    let projected = project_points(camera, pose, object_points)?;
    let s = SUPERSAMPLING as f32;
    // pixel centres stay aligned: x maps to (x + 0.5) * s - 0.5
    let mut polygon: Vec<Point<i32>> = Vec::with_capacity(projected.len());
    for p in &projected {
        let q = Point::new(
            ((p.x + 0.5) * s - 0.5).round() as i32,
            ((p.y + 0.5) * s - 0.5).round() as i32,
        );
        if polygon.last() != Some(&q) {
            polygon.push(q);
        }
    }
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    if polygon.len() < 3 {
        return Err(PoseError::GeometryDegenerate(
            "projected target collapses to fewer than 3 distinct points".to_string(),
        ));
    }
    let mut canvas = RgbImage::new(width * SUPERSAMPLING, height * SUPERSAMPLING);
    draw_polygon_mut(&mut canvas, &polygon, Rgb([255, 255, 255]));
    Ok(image::imageops::resize(
        &canvas,
        width,
        height,
        FilterType::Triangle,
    ))
}

/// Small tilt, arbitrary in-plane rotation, target roughly centred.
pub fn random_pose<R: Rng>(rng: &mut R, min_distance: f64, max_distance: f64) -> Pose {
    let rvec = na::Vector3::new(
        rng.random_range(-0.2..0.2),
        rng.random_range(-0.2..0.2),
        rng.random_range(-0.3..0.3),
    );
    let z = rng.random_range(min_distance..max_distance);
    let tvec = na::Vector3::new(
        rng.random_range(-0.05..0.05) * z,
        rng.random_range(-0.05..0.05) * z,
        z,
    );
    Pose::new(rvec, tvec)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    pub rvec: [f64; 3],
    pub tvec: [f64; 3],
    pub scale: f64,
    pub image_points: Vec<[f32; 2]>,
}

impl GroundTruth {
    pub fn pose(&self) -> Pose {
        Pose::new(
            na::Vector3::from(self.rvec),
            na::Vector3::from(self.tvec),
        )
    }
}

/// Writes `image.png`, `camera.json`, `template.svg` and `ground_truth.json`.
pub fn write_scene(
    output_dir: impl AsRef<Path>,
    template: &Template,
    scale: f64,
    camera: &CameraParams,
    pose: &Pose,
    width: u32,
    height: u32,
) -> Result<GroundTruth> {
    let output_dir = output_dir.as_ref();
    std::fs::create_dir_all(output_dir).map_err(|e| PoseError::io(output_dir, e))?;

    let object_points = template.object_points(scale)?;
    let image = render_target(camera, pose, &object_points, width, height)?;
    image.save(output_dir.join("image.png"))?;

    object_to_json(output_dir.join("camera.json"), &camera.to_json_value())?;

    let svg_path = output_dir.join("template.svg");
    std::fs::write(&svg_path, template_to_svg(template))
        .map_err(|e| PoseError::io(&svg_path, e))?;

    let ground_truth = GroundTruth {
        rvec: [pose.rvec.x, pose.rvec.y, pose.rvec.z],
        tvec: [pose.tvec.x, pose.tvec.y, pose.tvec.z],
        scale,
        image_points: project_points(camera, pose, &object_points)?
            .iter()
            .map(|p| p.to_array())
            .collect(),
    };
    object_to_json(output_dir.join("ground_truth.json"), &ground_truth)?;
    log::info!("wrote synthetic scene to {}", output_dir.display());
    Ok(ground_truth)
}
