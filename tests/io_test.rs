use glam::{Vec2, Vec3};
use nalgebra as na;
use template_pose::blob::DetectorConfig;
use template_pose::io::{format_vec3, object_from_json, object_to_json};
use template_pose::pipeline::PoseReport;
use template_pose::types::Pose;

#[test]
fn test_format_vec3() {
    let v = na::Vector3::new(0.1, -2.0, 3.25);
    assert_eq!(format_vec3(&v), "[0.100000, -2.000000, 3.250000]");
}

#[test]
fn test_detector_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("detector.json");
    let config = DetectorConfig {
        canny_low: 50.0,
        canny_high: 120.0,
        ..Default::default()
    };
    object_to_json(&path, &config).unwrap();
    let loaded: DetectorConfig = object_from_json(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_report_json_layout() {
    let report = PoseReport {
        pose: Pose::new(
            na::Vector3::new(0.1, 0.2, 0.3),
            na::Vector3::new(1.0, 2.0, 3.0),
        ),
        image_points: vec![Vec2::new(1.0, 2.0); 4],
        object_points: vec![Vec3::new(0.5, 0.25, 0.0); 4],
        blob_center: Vec2::new(10.0, 20.0),
        reprojection_rms: 0.5,
    };
    let json = report.to_json_value().unwrap();
    assert_eq!(json["rvec"], serde_json::json!([0.1, 0.2, 0.3]));
    assert_eq!(json["tvec"], serde_json::json!([1.0, 2.0, 3.0]));
    assert_eq!(json["image_points"].as_array().unwrap().len(), 4);
    assert_eq!(json["blob_center"], serde_json::json!([10.0, 20.0]));
    assert_eq!(json["reprojection_rms_px"], serde_json::json!(0.5));
}
