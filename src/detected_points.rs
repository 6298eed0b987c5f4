
/// Polygon picked out of an image by the blob extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedBlob {
    /// Approximated vertices in contour order, arbitrary start.
    pub vertices: Vec<glam::Vec2>,
    /// Centre of the minimum-area rotated bounding rectangle.
    pub center: glam::Vec2,
    pub area: f64,
    /// Number of traced contours that were approximated.
    pub contours_inspected: usize,
}

/// One template vertex paired with the image vertex it was matched to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeaturePoint {
    pub p2d: glam::Vec2,
    pub p3d: glam::Vec3,
}

pub fn zip_features(image_points: &[glam::Vec2], object_points: &[glam::Vec3]) -> Vec<FeaturePoint> {
    image_points
        .iter()
        .zip(object_points)
        .map(|(p2d, p3d)| FeaturePoint {
            p2d: *p2d,
            p3d: *p3d,
        })
        .collect()
}
