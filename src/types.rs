use nalgebra as na;

/// Rigid transform from object coordinates to camera coordinates.
///
/// `rvec` is a Rodrigues rotation vector (axis scaled by angle in radians).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub rvec: na::Vector3<f64>,
    pub tvec: na::Vector3<f64>,
}

impl Pose {
    pub fn new(rvec: na::Vector3<f64>, tvec: na::Vector3<f64>) -> Pose {
        Pose { rvec, tvec }
    }

    pub fn from_tuples(r: (f64, f64, f64), t: (f64, f64, f64)) -> Pose {
        Pose {
            rvec: na::Vector3::new(r.0, r.1, r.2),
            tvec: na::Vector3::new(t.0, t.1, t.2),
        }
    }

    pub fn to_na_isometry3(&self) -> na::Isometry3<f64> {
        na::Isometry3::new(self.tvec, self.rvec)
    }

    pub fn from_na_isometry3(iso: &na::Isometry3<f64>) -> Pose {
        Pose {
            rvec: iso.rotation.scaled_axis(),
            tvec: iso.translation.vector,
        }
    }

    /// Object point expressed in the camera frame.
    pub fn transform_point(&self, p3d: &na::Vector3<f64>) -> na::Vector3<f64> {
        na::Rotation3::new(self.rvec) * p3d + self.tvec
    }

    /// Angle in radians of the relative rotation between two poses.
    pub fn rotation_angle_to(&self, other: &Pose) -> f64 {
        let r0 = na::Rotation3::new(self.rvec);
        let r1 = na::Rotation3::new(other.rvec);
        r0.rotation_to(&r1).angle()
    }
}
