use nalgebra as na;
use tiny_solver::factors::Factor;

use crate::camera::CameraParams;

/// Pixel reprojection residual of one object point through the rational
/// distortion model. Parameter blocks are `[rvec, tvec]`.
#[derive(Debug, Clone)]
pub struct ReprojectionFactor {
    pub k: na::Matrix3<f64>,
    pub distortion: [f64; 8],
    pub p3d: na::Vector3<f64>,
    pub p2d: na::Vector2<f64>,
}

impl ReprojectionFactor {
    pub fn new(
        camera: &CameraParams,
        p3d: &na::Vector3<f64>,
        p2d: &na::Vector2<f64>,
    ) -> ReprojectionFactor {
        ReprojectionFactor {
            k: camera.k,
            distortion: camera.distortion,
            p3d: *p3d,
            p2d: *p2d,
        }
    }
}

impl<T: na::RealField> Factor<T> for ReprojectionFactor {
    fn residual_func(&self, params: &[na::DVector<T>]) -> na::DVector<T> {
        let c = |v: f64| -> T { na::convert(v) };
        let rvec = na::Vector3::new(
            params[0][0].clone(),
            params[0][1].clone(),
            params[0][2].clone(),
        );
        let tvec = na::Vector3::new(
            params[1][0].clone(),
            params[1][1].clone(),
            params[1][2].clone(),
        );
        let transform = na::Isometry3::new(tvec, rvec);
        let p3d_t = transform * na::Point3::new(c(self.p3d.x), c(self.p3d.y), c(self.p3d.z));
        let x = p3d_t.x.clone() / p3d_t.z.clone();
        let y = p3d_t.y.clone() / p3d_t.z.clone();

        let [k1, k2, p1, p2, k3, k4, k5, k6] = self.distortion.map(c);
        let two = c(2.0);
        let r2 = x.clone() * x.clone() + y.clone() * y.clone();
        let r4 = r2.clone() * r2.clone();
        let r6 = r4.clone() * r2.clone();
        let radial = (T::one() + k1 * r2.clone() + k2 * r4.clone() + k3 * r6.clone())
            / (T::one() + k4 * r2.clone() + k5 * r4 + k6 * r6);
        let xd = x.clone() * radial.clone()
            + two.clone() * p1.clone() * x.clone() * y.clone()
            + p2.clone() * (r2.clone() + two.clone() * x.clone() * x.clone());
        let yd = y.clone() * radial
            + p1 * (r2 + two.clone() * y.clone() * y.clone())
            + two * p2 * x * y;

        let uvw = self.k.map(c) * na::Vector3::new(xd, yd, T::one());
        na::dvector![
            uvw.x.clone() / uvw.z.clone() - c(self.p2d.x),
            uvw.y.clone() / uvw.z.clone() - c(self.p2d.y)
        ]
    }
}
