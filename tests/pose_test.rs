use glam::{Vec2, Vec3};
use nalgebra as na;
use template_pose::PoseError;
use template_pose::camera::CameraParams;
use template_pose::optimization::factors::ReprojectionFactor;
use template_pose::optimization::{
    estimate_pose, init_pose, refine_pose, reprojection_cost, reprojection_rms,
};
use template_pose::synthetic::{house_template, project_points};
use template_pose::types::Pose;
use tiny_solver::factors::Factor;

fn camera() -> CameraParams {
    CameraParams::new(
        na::Matrix3::new(800.0, 0.0, 400.0, 0.0, 800.0, 300.0, 0.0, 0.0, 1.0),
        [-0.15, 0.04, 0.0008, -0.0005, 0.0, 0.0, 0.0, 0.0],
    )
}

fn ground_truth() -> Pose {
    Pose::new(
        na::Vector3::new(0.1, -0.15, 0.05),
        na::Vector3::new(0.01, -0.005, 0.25),
    )
}

fn correspondences() -> (Vec<Vec2>, Vec<Vec3>) {
    let object = house_template().object_points(10000.0).unwrap();
    let image = project_points(&camera(), &ground_truth(), &object).unwrap();
    (image, object)
}

#[test]
fn test_pose_from_exact_correspondences() {
    let (p2ds, p3ds) = correspondences();
    let pose = estimate_pose(&p2ds, &p3ds, &camera()).unwrap();
    let gt = ground_truth();
    assert!((pose.rvec - gt.rvec).norm() < 1e-6, "{:?}", pose);
    assert!((pose.tvec - gt.tvec).norm() < 1e-6, "{:?}", pose);
    assert!(reprojection_rms(&camera(), &pose, &p2ds, &p3ds) < 1e-3);
}

#[test]
fn test_init_pose_is_close() {
    let (p2ds, p3ds) = correspondences();
    let pose = init_pose(&p2ds, &p3ds, &camera()).unwrap();
    let gt = ground_truth();
    assert!(pose.rotation_angle_to(&gt) < 1e-2);
    assert!((pose.tvec - gt.tvec).norm() < 1e-3);
}

#[test]
fn test_refine_from_perturbed_pose() {
    let (p2ds, p3ds) = correspondences();
    let gt = ground_truth();
    let perturbed = Pose::new(
        gt.rvec + na::Vector3::new(0.03, -0.02, 0.04),
        gt.tvec + na::Vector3::new(0.004, 0.003, -0.01),
    );
    let object: Vec<na::Vector3<f64>> = p3ds
        .iter()
        .map(|p| na::Vector3::new(p.x as f64, p.y as f64, p.z as f64))
        .collect();
    let image: Vec<na::Vector2<f64>> = p2ds
        .iter()
        .map(|p| na::Vector2::new(p.x as f64, p.y as f64))
        .collect();
    let before = reprojection_rms(&camera(), &perturbed, &p2ds, &p3ds);
    let refined = refine_pose(&camera(), &object, &image, &perturbed, 100);
    let after = reprojection_rms(&camera(), &refined, &p2ds, &p3ds);
    assert!(after < before);
    assert!(refined.rotation_angle_to(&gt) < 1e-5);
    assert!((refined.tvec - gt.tvec).norm() < 1e-6);
}

#[test]
fn test_count_mismatch() {
    let (p2ds, p3ds) = correspondences();
    let result = estimate_pose(&p2ds[..4], &p3ds, &camera());
    assert!(matches!(result, Err(PoseError::Solver(_))));
}

#[test]
fn test_too_few_points() {
    let (p2ds, p3ds) = correspondences();
    let result = estimate_pose(&p2ds[..3], &p3ds[..3], &camera());
    assert!(matches!(result, Err(PoseError::Solver(_))));
}

#[test]
fn test_pose_isometry_round_trip() {
    let pose = ground_truth();
    let back = Pose::from_na_isometry3(&pose.to_na_isometry3());
    assert!((back.rvec - pose.rvec).norm() < 1e-12);
    assert!((back.tvec - pose.tvec).norm() < 1e-12);

    let p = na::Vector3::new(0.02, -0.01, 0.0);
    let via_iso = pose.to_na_isometry3() * na::Point3::from(p);
    assert!((via_iso.coords - pose.transform_point(&p)).norm() < 1e-12);
    assert!(pose.rotation_angle_to(&pose) < 1e-12);
}

#[test]
fn test_reprojection_factor_matches_projection() {
    let camera = CameraParams::new(
        na::Matrix3::new(800.0, 0.0, 400.0, 0.0, 810.0, 300.0, 0.0, 0.0, 1.0),
        [-0.2, 0.05, 0.001, -0.0007, 0.01, 0.02, -0.01, 0.005],
    );
    let gt = ground_truth();
    let p3d = na::Vector3::new(0.03, -0.02, 0.0);
    let p2d = camera.project_one(&gt.transform_point(&p3d)).unwrap();
    let params = [
        na::dvector![gt.rvec.x, gt.rvec.y, gt.rvec.z],
        na::dvector![gt.tvec.x, gt.tvec.y, gt.tvec.z],
    ];

    let factor = ReprojectionFactor::new(&camera, &p3d, &p2d);
    let residual = <ReprojectionFactor as Factor<f64>>::residual_func(&factor, &params);
    assert_eq!(residual.len(), 2);
    assert!(residual.norm() < 1e-9, "{}", residual);

    let shifted = ReprojectionFactor::new(&camera, &p3d, &(p2d + na::Vector2::new(1.5, -2.0)));
    let residual = <ReprojectionFactor as Factor<f64>>::residual_func(&shifted, &params);
    assert!((residual[0] + 1.5).abs() < 1e-9 && (residual[1] - 2.0).abs() < 1e-9);
}

#[test]
fn test_refine_never_worsens_cost() {
    let (p2ds, p3ds) = correspondences();
    let object: Vec<na::Vector3<f64>> = p3ds
        .iter()
        .map(|p| na::Vector3::new(p.x as f64, p.y as f64, p.z as f64))
        .collect();
    let noise = [(0.7, -0.4), (-0.5, 0.9), (0.3, 0.6), (-0.8, -0.2), (0.4, -0.7)];
    let image: Vec<na::Vector2<f64>> = p2ds
        .iter()
        .zip(noise)
        .map(|(p, (dx, dy))| na::Vector2::new(p.x as f64 + dx, p.y as f64 + dy))
        .collect();
    let gt = ground_truth();
    let refined = refine_pose(&camera(), &object, &image, &gt, 50);
    assert!(
        reprojection_cost(&camera(), &refined, &object, &image)
            <= reprojection_cost(&camera(), &gt, &object, &image)
    );
}
