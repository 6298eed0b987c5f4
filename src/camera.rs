use std::path::Path;

use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::error::{PoseError, Result};
use crate::io::object_from_json;

const UNDISTORT_ITERATIONS: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CameraParamsFile {
    intrinsics: IntrinsicsJson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IntrinsicsJson {
    #[serde(rename = "K")]
    k: Vec<f64>,
    distortion: Option<Vec<f64>>,
}

/// Pinhole intrinsics with the 8-coefficient rational distortion model
/// `[k1, k2, p1, p2, k3, k4, k5, k6]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraParams {
    pub k: na::Matrix3<f64>,
    pub distortion: [f64; 8],
}

impl CameraParams {
    pub fn new(k: na::Matrix3<f64>, distortion: [f64; 8]) -> CameraParams {
        CameraParams { k, distortion }
    }

    pub fn pinhole(fx: f64, fy: f64, cx: f64, cy: f64) -> CameraParams {
        CameraParams {
            k: na::Matrix3::new(fx, 0.0, cx, 0.0, fy, cy, 0.0, 0.0, 1.0),
            distortion: [0.0; 8],
        }
    }

    pub fn from_json_str(json: &str) -> Result<CameraParams> {
        let file: CameraParamsFile = serde_json::from_str(json)?;
        Self::from_file_struct(file)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<CameraParams> {
        let file: CameraParamsFile = object_from_json(path)?;
        Self::from_file_struct(file)
    }

    fn from_file_struct(file: CameraParamsFile) -> Result<CameraParams> {
        let IntrinsicsJson { k, distortion } = file.intrinsics;
        let distortion = distortion
            .ok_or_else(|| PoseError::Parse("intrinsics.distortion is missing".to_string()))?;
        if k.len() != 9 {
            return Err(PoseError::Parse(format!(
                "intrinsics.K needs 9 values, got {}",
                k.len()
            )));
        }
        let coeffs = match distortion.len() {
            4 | 5 | 8 => {
                let mut d = [0.0; 8];
                d[..distortion.len()].copy_from_slice(&distortion);
                d
            }
            n => {
                return Err(PoseError::Parse(format!(
                    "intrinsics.distortion needs 4, 5 or 8 values, got {n}"
                )));
            }
        };
        Ok(CameraParams {
            k: na::Matrix3::from_row_slice(&k),
            distortion: coeffs,
        })
    }

    /// Serializable form matching the reader's layout.
    pub fn to_json_value(&self) -> serde_json::Value {
        let k: Vec<f64> = (0..3)
            .flat_map(|r| (0..3).map(move |c| (r, c)))
            .map(|(r, c)| self.k[(r, c)])
            .collect();
        serde_json::json!({
            "intrinsics": {
                "K": k,
                "distortion": self.distortion.to_vec(),
            }
        })
    }

    fn distort_normalized(&self, x: f64, y: f64) -> (f64, f64) {
        let [k1, k2, p1, p2, k3, k4, k5, k6] = self.distortion;
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let radial = (1.0 + k1 * r2 + k2 * r4 + k3 * r6) / (1.0 + k4 * r2 + k5 * r4 + k6 * r6);
        let xd = x * radial + 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
        let yd = y * radial + p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;
        (xd, yd)
    }

    /// Projects a camera-frame point to pixels. `None` behind the camera.
    pub fn project_one(&self, p3d: &na::Vector3<f64>) -> Option<na::Vector2<f64>> {
        if p3d.z <= f64::EPSILON {
            return None;
        }
        let (xd, yd) = self.distort_normalized(p3d.x / p3d.z, p3d.y / p3d.z);
        let uvw = self.k * na::Vector3::new(xd, yd, 1.0);
        Some(na::Vector2::new(uvw.x / uvw.z, uvw.y / uvw.z))
    }

    /// Maps pixels to undistorted normalized image coordinates (z = 1).
    pub fn undistort_points(&self, p2ds: &[na::Vector2<f64>]) -> Result<Vec<na::Vector2<f64>>> {
        let k_inv = self
            .k
            .try_inverse()
            .ok_or_else(|| PoseError::Solver("camera matrix is singular".to_string()))?;
        let [k1, k2, p1, p2, k3, k4, k5, k6] = self.distortion;
        Ok(p2ds
            .iter()
            .map(|p| {
                let h = k_inv * na::Vector3::new(p.x, p.y, 1.0);
                let (x0, y0) = (h.x / h.z, h.y / h.z);
                let (mut x, mut y) = (x0, y0);
                for _ in 0..UNDISTORT_ITERATIONS {
                    let r2 = x * x + y * y;
                    let r4 = r2 * r2;
                    let r6 = r4 * r2;
                    let icdist =
                        (1.0 + k4 * r2 + k5 * r4 + k6 * r6) / (1.0 + k1 * r2 + k2 * r4 + k3 * r6);
                    let delta_x = 2.0 * p1 * x * y + p2 * (r2 + 2.0 * x * x);
                    let delta_y = p1 * (r2 + 2.0 * y * y) + 2.0 * p2 * x * y;
                    x = (x0 - delta_x) * icdist;
                    y = (y0 - delta_y) * icdist;
                }
                na::Vector2::new(x, y)
            })
            .collect())
    }
}
