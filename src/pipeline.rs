use image::DynamicImage;
use serde::Serialize;

use crate::blob::{DetectorConfig, extract_blob};
use crate::camera::CameraParams;
use crate::correspondence::{self, MIN_VERTICES};
use crate::error::{PoseError, Result};
use crate::optimization::{estimate_pose, reprojection_rms};
use crate::template::Template;
use crate::types::Pose;

/// Everything a single run produces.
#[derive(Debug, Clone)]
pub struct PoseReport {
    pub pose: Pose,
    /// Image vertices in template order.
    pub image_points: Vec<glam::Vec2>,
    pub object_points: Vec<glam::Vec3>,
    pub blob_center: glam::Vec2,
    pub reprojection_rms: f64,
}

#[derive(Serialize)]
struct PoseReportJson {
    rvec: [f64; 3],
    tvec: [f64; 3],
    reprojection_rms_px: f64,
    blob_center: [f32; 2],
    image_points: Vec<[f32; 2]>,
    object_points: Vec<[f32; 3]>,
}

impl PoseReport {
    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        let json = PoseReportJson {
            rvec: [self.pose.rvec.x, self.pose.rvec.y, self.pose.rvec.z],
            tvec: [self.pose.tvec.x, self.pose.tvec.y, self.pose.tvec.z],
            reprojection_rms_px: self.reprojection_rms,
            blob_center: self.blob_center.to_array(),
            image_points: self.image_points.iter().map(|p| p.to_array()).collect(),
            object_points: self.object_points.iter().map(|p| p.to_array()).collect(),
        };
        Ok(serde_json::to_value(json)?)
    }
}

/// Template plus the constants that stay fixed for a run.
#[derive(Debug, Clone)]
pub struct PosePipeline {
    pub template: Template,
    pub scale: f64,
    pub detector: DetectorConfig,
}

impl PosePipeline {
    pub fn new(template: Template, scale: f64, detector: DetectorConfig) -> PosePipeline {
        PosePipeline {
            template,
            scale,
            detector,
        }
    }

    pub fn run(&self, image: &DynamicImage, camera: &CameraParams) -> Result<PoseReport> {
        let vertex_count = self.template.vertex_count();
        if vertex_count < MIN_VERTICES {
            return Err(PoseError::GeometryDegenerate(format!(
                "template has {vertex_count} vertices, at least {MIN_VERTICES} are needed"
            )));
        }
        let object_points = self.template.object_points(self.scale)?;

        let blob = extract_blob(image, vertex_count, &self.detector)?;
        let image_points =
            correspondence::align(blob.vertices, blob.center, &self.template.vertices)?;

        let pose = estimate_pose(&image_points, &object_points, camera)?;
        let rms = reprojection_rms(camera, &pose, &image_points, &object_points);
        log::info!("reprojection rms {:.3} px", rms);

        Ok(PoseReport {
            pose,
            image_points,
            object_points,
            blob_center: blob.center,
            reprojection_rms: rms,
        })
    }
}
