use nalgebra as na;
use sqpnp_simple::sqpnp_solve_glam;

use super::refine::refine_pose;
use crate::camera::CameraParams;
use crate::error::{PoseError, Result};
use crate::types::Pose;

pub const MIN_CORRESPONDENCES: usize = 4;
const REFINE_ITERATIONS: usize = 50;

fn check_correspondences(p2ds: &[glam::Vec2], p3ds: &[glam::Vec3]) -> Result<()> {
    if p2ds.len() != p3ds.len() {
        return Err(PoseError::Solver(format!(
            "{} image points but {} object points",
            p2ds.len(),
            p3ds.len()
        )));
    }
    if p2ds.len() < MIN_CORRESPONDENCES {
        return Err(PoseError::Solver(format!(
            "need at least {MIN_CORRESPONDENCES} correspondences, got {}",
            p2ds.len()
        )));
    }
    Ok(())
}

/// SQPnP on undistorted normalized coordinates.
pub fn init_pose(
    p2ds: &[glam::Vec2],
    p3ds: &[glam::Vec3],
    camera: &CameraParams,
) -> Result<Pose> {
    check_correspondences(p2ds, p3ds)?;
    let pixels: Vec<na::Vector2<f64>> = p2ds
        .iter()
        .map(|p| na::Vector2::new(p.x as f64, p.y as f64))
        .collect();
    let p2ds_z: Vec<glam::Vec2> = camera
        .undistort_points(&pixels)?
        .iter()
        .map(|p| glam::Vec2::new(p.x as f32, p.y as f32))
        .collect();
    let p3ds: Vec<glam::Vec3> = p3ds.to_vec();
    let (r, t) = sqpnp_solve_glam(&p3ds, &p2ds_z)
        .ok_or_else(|| PoseError::Solver("sqpnp found no solution".to_string()))?;
    log::debug!("sqpnp r {:?} t {:?}", r, t);
    Ok(Pose::from_tuples(r, t))
}

/// Pose of the object given ordered 2D-3D correspondences.
///
/// SQPnP provides the initial pose, which is then refined against the full
/// distortion model.
pub fn estimate_pose(
    p2ds: &[glam::Vec2],
    p3ds: &[glam::Vec3],
    camera: &CameraParams,
) -> Result<Pose> {
    let initial = init_pose(p2ds, p3ds, camera)?;
    let (object_points, image_points) = to_na_points(p2ds, p3ds);
    let refined = refine_pose(
        camera,
        &object_points,
        &image_points,
        &initial,
        REFINE_ITERATIONS,
    );
    Ok(refined)
}

pub(crate) fn to_na_points(
    p2ds: &[glam::Vec2],
    p3ds: &[glam::Vec3],
) -> (Vec<na::Vector3<f64>>, Vec<na::Vector2<f64>>) {
    p3ds.iter()
        .zip(p2ds)
        .map(|(p3, p2)| {
            (
                na::Vector3::new(p3.x as f64, p3.y as f64, p3.z as f64),
                na::Vector2::new(p2.x as f64, p2.y as f64),
            )
        })
        .unzip()
}

/// Root-mean-square pixel reprojection error. Infinite if a point projects
/// behind the camera.
pub fn reprojection_rms(
    camera: &CameraParams,
    pose: &Pose,
    p2ds: &[glam::Vec2],
    p3ds: &[glam::Vec3],
) -> f64 {
    let (object_points, image_points) = to_na_points(p2ds, p3ds);
    if object_points.is_empty() {
        return 0.0;
    }
    let mut sum = 0.0;
    for (p3, p2) in object_points.iter().zip(&image_points) {
        match camera.project_one(&pose.transform_point(p3)) {
            Some(p) => sum += (p - p2).norm_squared(),
            None => return f64::INFINITY,
        }
    }
    (sum / object_points.len() as f64).sqrt()
}
