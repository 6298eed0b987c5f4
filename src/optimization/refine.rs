use std::collections::HashMap;

use nalgebra as na;
use tiny_solver::LevenbergMarquardtOptimizer;
use tiny_solver::optimizer::{Optimizer, OptimizerOptions};
use tiny_solver::problem::Problem;

use super::factors::ReprojectionFactor;
use crate::camera::CameraParams;
use crate::types::Pose;

/// Sum of squared pixel residuals, infinite if a point falls behind the camera.
pub fn reprojection_cost(
    camera: &CameraParams,
    pose: &Pose,
    p3ds: &[na::Vector3<f64>],
    p2ds: &[na::Vector2<f64>],
) -> f64 {
    p3ds.iter()
        .zip(p2ds)
        .map(|(p3, p2)| match camera.project_one(&pose.transform_point(p3)) {
            Some(p) => (p - p2).norm_squared(),
            None => f64::INFINITY,
        })
        .sum()
}

/// Levenberg–Marquardt on pixel reprojection error.
///
/// The returned pose never has a higher cost than `initial`.
pub fn refine_pose(
    camera: &CameraParams,
    p3ds: &[na::Vector3<f64>],
    p2ds: &[na::Vector2<f64>],
    initial: &Pose,
    max_iterations: usize,
) -> Pose {
    let mut problem = Problem::new();
    for (p3d, p2d) in p3ds.iter().zip(p2ds) {
        let cost = ReprojectionFactor::new(camera, p3d, p2d);
        problem.add_residual_block(2, &["rvec", "tvec"], Box::new(cost), None);
    }

    let initial_values = HashMap::<String, na::DVector<f64>>::from([
        (
            "rvec".to_string(),
            na::dvector![initial.rvec.x, initial.rvec.y, initial.rvec.z],
        ),
        (
            "tvec".to_string(),
            na::dvector![initial.tvec.x, initial.tvec.y, initial.tvec.z],
        ),
    ]);

    let optimizer = LevenbergMarquardtOptimizer::default();
    let options = OptimizerOptions {
        max_iteration: max_iterations,
        min_abs_error_decrease_threshold: 1e-14,
        min_rel_error_decrease_threshold: 1e-10,
        min_error_threshold: 1e-16,
        ..OptimizerOptions::default()
    };
    let Some(result) = optimizer.optimize(&problem, &initial_values, Some(options)) else {
        log::warn!("pose refinement did not converge, keeping the initial pose");
        return *initial;
    };
    let (Some(rvec), Some(tvec)) = (result.get("rvec"), result.get("tvec")) else {
        return *initial;
    };
    let refined = Pose::new(
        na::Vector3::new(rvec[0], rvec[1], rvec[2]),
        na::Vector3::new(tvec[0], tvec[1], tvec[2]),
    );

    let before = reprojection_cost(camera, initial, p3ds, p2ds);
    let after = reprojection_cost(camera, &refined, p3ds, p2ds);
    log::debug!("refined cost {:.3e} -> {:.3e}", before, after);
    if after <= before { refined } else { *initial }
}
