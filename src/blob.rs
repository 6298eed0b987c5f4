//! Finds the target polygon in a photograph.
//!
//! grayscale -> contrast -> blur -> canny -> dilate -> contours -> polygon
//! approximation, then the largest approximation with the expected vertex
//! count wins. Its corners are then moved to the intersections of lines fitted
//! to the undilated edge pixels along each side.

use geo::{Area, Centroid, MinimumRotatedRect, Simplify};
use geo_types::{Coord, LineString, Polygon};
use image::{DynamicImage, GrayImage};
use imageproc::contours::{BorderType, Contour};
use imageproc::distance_transform::Norm;
use serde::{Deserialize, Serialize};

use crate::detected_points::DetectedBlob;
use crate::error::{PoseError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub contrast_gain: f32,
    pub contrast_bias: f32,
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Half side of the square structuring element.
    pub dilation_radius: u8,
    pub approx_epsilon: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            contrast_gain: 2.0,
            contrast_bias: 0.0,
            blur_sigma: 1.0,
            canny_low: 180.0,
            canny_high: 360.0,
            dilation_radius: 5,
            approx_epsilon: 5.0,
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.contrast_gain.is_finite() && self.contrast_bias.is_finite()) {
            return Err(PoseError::Config(
                "contrast gain and bias must be finite".to_string(),
            ));
        }
        if !(self.blur_sigma > 0.0) {
            return Err(PoseError::Config(format!(
                "blur sigma must be positive, got {}",
                self.blur_sigma
            )));
        }
        if !(self.approx_epsilon > 0.0) {
            return Err(PoseError::Config(format!(
                "approximation epsilon must be positive, got {}",
                self.approx_epsilon
            )));
        }
        if self.canny_low > self.canny_high {
            return Err(PoseError::Config(format!(
                "canny low threshold {} exceeds high threshold {}",
                self.canny_low, self.canny_high
            )));
        }
        Ok(())
    }
}

/// `saturate(gain * v + bias)` per pixel.
pub fn adjust_contrast(gray: &GrayImage, gain: f32, bias: f32) -> GrayImage {
    let mut out = gray.clone();
    for p in out.pixels_mut() {
        p[0] = (p[0] as f32 * gain + bias).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Normalized 3x3 Gaussian kernel, row major.
pub fn gaussian_kernel_3x3(sigma: f32) -> [f32; 9] {
    let side = (-1.0 / (2.0 * sigma * sigma)).exp();
    let total = (1.0 + 2.0 * side) * (1.0 + 2.0 * side);
    let w = [side, 1.0, side];
    let mut kernel = [0.0; 9];
    for r in 0..3 {
        for c in 0..3 {
            kernel[r * 3 + c] = w[r] * w[c] / total;
        }
    }
    kernel
}

/// Canny edges of the contrast adjusted and blurred grayscale image.
pub fn canny_edges(image: &DynamicImage, config: &DetectorConfig) -> GrayImage {
    let gray = image.to_luma8();
    let contrasted = adjust_contrast(&gray, config.contrast_gain, config.contrast_bias);
    let kernel = gaussian_kernel_3x3(config.blur_sigma);
    let blurred: GrayImage = imageproc::filter::filter3x3::<_, f32, u8>(&contrasted, &kernel);
    imageproc::edges::canny(&blurred, config.canny_low, config.canny_high)
}

/// Closes gaps in the edges so the target outline traces as one contour.
pub fn dilate_edges(edges: &GrayImage, radius: u8) -> GrayImage {
    if radius == 0 {
        edges.clone()
    } else {
        imageproc::morphology::dilate(edges, Norm::LInf, radius)
    }
}

fn dist2(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    dx * dx + dy * dy
}

fn farthest_from(points: &[Coord<f64>], from: Coord<f64>) -> usize {
    let mut best = 0;
    let mut best_d = -1.0;
    for (i, p) in points.iter().enumerate() {
        let d = dist2(*p, from);
        if d > best_d {
            best_d = d;
            best = i;
        }
    }
    best
}

/// Ramer–Douglas–Peucker on a closed ring.
///
/// The ring is split at two extreme points so the arbitrary first contour
/// point is not forced into the result. The output is open: the last vertex is
/// not a repeat of the first.
pub fn approximate_closed_polygon(points: &[Coord<f64>], epsilon: f64) -> Vec<Coord<f64>> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let a = farthest_from(points, points[0]);
    let b = farthest_from(points, points[a]);
    if a == b {
        return vec![points[a]];
    }
    let n = points.len();
    let chain = |from: usize, to: usize| -> LineString<f64> {
        let len = (to + n - from) % n + 1;
        LineString::new((0..len).map(|i| points[(from + i) % n]).collect())
    };
    let first = chain(a, b).simplify(&epsilon);
    let second = chain(b, a).simplify(&epsilon);
    let mut out: Vec<Coord<f64>> = first.0;
    // both chains repeat their endpoints
    out.pop();
    out.extend(second.0);
    out.pop();
    out
}

fn contour_coords(contour: &Contour<i32>) -> Vec<Coord<f64>> {
    contour
        .points
        .iter()
        .map(|p| Coord {
            x: p.x as f64,
            y: p.y as f64,
        })
        .collect()
}

pub fn polygon_area(vertices: &[Coord<f64>]) -> f64 {
    Polygon::new(LineString::new(vertices.to_vec()), vec![]).unsigned_area()
}

/// Centre of the minimum-area rotated rectangle enclosing `vertices`.
pub fn min_area_rect_center(vertices: &[Coord<f64>]) -> Option<Coord<f64>> {
    let polygon = Polygon::new(LineString::new(vertices.to_vec()), vec![]);
    let rect = polygon.minimum_rotated_rect()?;
    rect.centroid().map(|c| Coord { x: c.x(), y: c.y() })
}

/// Picks the largest approximation with `expected_vertices` vertices among
/// the candidates. Ties keep the first.
pub fn select_largest(
    candidates: &[Vec<Coord<f64>>],
    expected_vertices: usize,
) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, approx) in candidates.iter().enumerate() {
        if approx.len() != expected_vertices {
            continue;
        }
        let area = polygon_area(approx);
        log::debug!("candidate {} area {:.1}", i, area);
        match best {
            Some((_, best_area)) if area <= best_area => {}
            _ => best = Some((i, area)),
        }
    }
    best
}

const MIN_LINE_POINTS: usize = 5;

type Line = (Coord<f64>, Coord<f64>);

/// Edge pixels within `band` of the segment `a`-`b`, skipping both ends.
fn edge_pixels_near(
    edges: &GrayImage,
    a: Coord<f64>,
    b: Coord<f64>,
    band: f64,
) -> Vec<Coord<f64>> {
    let len = dist2(a, b).sqrt();
    let margin = (2.0 * band).max(0.1 * len);
    if len <= 2.0 * margin {
        return Vec::new();
    }
    let dir = Coord {
        x: (b.x - a.x) / len,
        y: (b.y - a.y) / len,
    };
    let (width, height) = edges.dimensions();
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let clamp = |v: f64, max: u32| v.max(0.0).min(max.saturating_sub(1) as f64) as u32;
    let (x0, x1) = (
        clamp((a.x.min(b.x) - band).floor(), width),
        clamp((a.x.max(b.x) + band).ceil(), width),
    );
    let (y0, y1) = (
        clamp((a.y.min(b.y) - band).floor(), height),
        clamp((a.y.max(b.y) + band).ceil(), height),
    );

    let mut points = Vec::new();
    for y in y0..=y1 {
        for x in x0..=x1 {
            if edges.get_pixel(x, y)[0] == 0 {
                continue;
            }
            let dx = x as f64 - a.x;
            let dy = y as f64 - a.y;
            let along = dx * dir.x + dy * dir.y;
            let across = dx * dir.y - dy * dir.x;
            if along >= margin && along <= len - margin && across.abs() <= band {
                points.push(Coord {
                    x: x as f64,
                    y: y as f64,
                });
            }
        }
    }
    points
}

/// Total least squares line as (centroid, unit direction).
fn fit_line(points: &[Coord<f64>]) -> Option<Line> {
    if points.len() < MIN_LINE_POINTS {
        return None;
    }
    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let my = points.iter().map(|p| p.y).sum::<f64>() / n;
    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for p in points {
        let dx = p.x - mx;
        let dy = p.y - my;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }
    let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
    Some((
        Coord { x: mx, y: my },
        Coord {
            x: theta.cos(),
            y: theta.sin(),
        },
    ))
}

fn intersect((p, d): Line, (q, e): Line) -> Option<Coord<f64>> {
    let det = d.x * e.y - d.y * e.x;
    if det.abs() < 1e-6 {
        return None;
    }
    let s = ((q.x - p.x) * e.y - (q.y - p.y) * e.x) / det;
    Some(Coord {
        x: p.x + s * d.x,
        y: p.y + s * d.y,
    })
}

/// Moves each corner to the intersection of the lines fitted to the edge
/// pixels of its two sides.
///
/// `band` is the distance from a side of `vertices` within which edge pixels
/// count. A corner keeps its position when either side has too few pixels,
/// the sides are parallel, or the intersection lands farther than `4 * band`
/// away.
pub fn refine_corners(
    edges: &GrayImage,
    vertices: &[Coord<f64>],
    band: f64,
) -> Vec<Coord<f64>> {
    let n = vertices.len();
    if n < 3 {
        return vertices.to_vec();
    }
    let lines: Vec<Option<Line>> = (0..n)
        .map(|i| {
            let side = edge_pixels_near(edges, vertices[i], vertices[(i + 1) % n], band);
            fit_line(&side)
        })
        .collect();
    let max_shift = 4.0 * band;
    (0..n)
        .map(|i| {
            let corner = match (lines[(i + n - 1) % n], lines[i]) {
                (Some(before), Some(after)) => intersect(before, after),
                _ => None,
            };
            match corner {
                Some(c) if dist2(c, vertices[i]) <= max_shift * max_shift => c,
                _ => {
                    log::debug!("corner {} kept at {:?}", i, vertices[i]);
                    vertices[i]
                }
            }
        })
        .collect()
}

/// Extracts the blob whose approximation has `expected_vertices` corners.
pub fn extract_blob(
    image: &DynamicImage,
    expected_vertices: usize,
    config: &DetectorConfig,
) -> Result<DetectedBlob> {
    config.validate()?;
    let edges = canny_edges(image, config);
    let dilated = dilate_edges(&edges, config.dilation_radius);
    let contours = imageproc::contours::find_contours::<i32>(&dilated);
    log::info!("traced {} contours", contours.len());

    let approximations: Vec<Vec<Coord<f64>>> = contours
        .iter()
        .map(|contour| {
            let approx =
                approximate_closed_polygon(&contour_coords(contour), config.approx_epsilon);
            log::trace!(
                "{} border with {} points -> {} vertices",
                match contour.border_type {
                    BorderType::Outer => "outer",
                    BorderType::Hole => "hole",
                },
                contour.points.len(),
                approx.len()
            );
            approx
        })
        .collect();

    let (idx, area) =
        select_largest(&approximations, expected_vertices).ok_or(PoseError::NoMatch {
            expected: expected_vertices,
            contours: contours.len(),
        })?;
    // the dilated outline sits up to sqrt(2) * radius off the true edge
    let band = 2.0 * config.dilation_radius as f64 + 3.0;
    let selected = refine_corners(&edges, &approximations[idx], band);
    let center = min_area_rect_center(&selected).ok_or_else(|| {
        PoseError::GeometryDegenerate("selected blob has no bounding rectangle".to_string())
    })?;
    log::info!(
        "selected contour {} with area {:.1} centred at ({:.1}, {:.1})",
        idx,
        area,
        center.x,
        center.y
    );

    Ok(DetectedBlob {
        vertices: selected
            .iter()
            .map(|c| glam::Vec2::new(c.x as f32, c.y as f32))
            .collect(),
        center: glam::Vec2::new(center.x as f32, center.y as f32),
        area,
        contours_inspected: contours.len(),
    })
}
