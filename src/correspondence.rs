//! Canonical start and winding for a detected polygon.
//!
//! A detected contour has no natural first vertex. The target shapes carry a
//! single protruding feature: of all windows of four consecutive vertices
//! `(a, b, c, d)`, the one whose lines `ab` and `cd` meet farthest from the
//! polygon centre identifies it, and `c` becomes index 0.
//!
//! ```text
//!        /\ 2
//!     1 |  | 3
//!     0 |__| 4
//! ```

use crate::error::{PoseError, Result};

pub const MIN_VERTICES: usize = 4;

/// Signed shoelace area. Only the sign is meaningful across two polygons
/// expressed in the same axis convention.
pub fn signed_area(points: &[glam::Vec2]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let p = points[i];
            let q = points[(i + 1) % n];
            p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64
        })
        .sum::<f64>()
        / 2.0
}

/// Reverses `points` in place if its winding differs from `reference`.
/// Returns whether the sequence was reversed.
pub fn match_winding(points: &mut [glam::Vec2], reference: &[glam::Vec2]) -> bool {
    let target = signed_area(reference);
    let current = signed_area(points);
    if target == 0.0 || current == 0.0 || target.signum() == current.signum() {
        return false;
    }
    points.reverse();
    true
}

/// Intersection of line `ab` with line `cd`; `None` for parallel lines.
pub fn line_line_intersection(
    a: glam::Vec2,
    b: glam::Vec2,
    c: glam::Vec2,
    d: glam::Vec2,
) -> Option<glam::DVec2> {
    let (a, b, c, d) = (a.as_dvec2(), b.as_dvec2(), c.as_dvec2(), d.as_dvec2());
    // a1 x + b1 y = c1
    let a1 = b.y - a.y;
    let b1 = a.x - b.x;
    let c1 = a1 * a.x + b1 * a.y;
    let a2 = d.y - c.y;
    let b2 = c.x - d.x;
    let c2 = a2 * c.x + b2 * c.y;

    let determinant = a1 * b2 - a2 * b1;
    if determinant == 0.0 {
        return None;
    }
    Some(glam::DVec2::new(
        (b2 * c1 - b1 * c2) / determinant,
        (a1 * c2 - a2 * c1) / determinant,
    ))
}

/// Left rotation that brings `points` into canonical order.
///
/// Windows are visited starting at 0 and then walking backwards
/// (`0, V-1, V-2, ..., 1`); the first strictly farthest window wins.
pub fn extremum_offset(points: &[glam::Vec2], center: glam::Vec2) -> Result<usize> {
    let n = points.len();
    if n < MIN_VERTICES {
        return Err(PoseError::GeometryDegenerate(format!(
            "alignment needs at least {MIN_VERTICES} vertices, got {n}"
        )));
    }
    let center = center.as_dvec2();
    let mut best: Option<(usize, f64)> = None;
    for step in 0..n {
        let s = (n - step) % n;
        let v = |k: usize| points[(s + k) % n];
        let Some(intersection) = line_line_intersection(v(0), v(1), v(2), v(3)) else {
            log::warn!("window starting at {} has parallel edges, skipped", s);
            continue;
        };
        let distance = intersection.distance(center);
        log::debug!(
            "window {} meets at ({:.1}, {:.1}), {:.1} from centre",
            s,
            intersection.x,
            intersection.y,
            distance
        );
        match best {
            Some((_, best_distance)) if distance <= best_distance => {}
            _ => best = Some((s, distance)),
        }
    }
    let (s, _) = best.ok_or_else(|| {
        PoseError::GeometryDegenerate("every vertex window has parallel edges".to_string())
    })?;
    Ok((s + 2) % n)
}

/// Matches winding with `template` and rotates `points` to the canonical start.
pub fn align(
    mut points: Vec<glam::Vec2>,
    center: glam::Vec2,
    template: &[glam::Vec2],
) -> Result<Vec<glam::Vec2>> {
    if match_winding(&mut points, template) {
        log::debug!("detected polygon reversed to match template winding");
    }
    let offset = extremum_offset(&points, center)?;
    log::info!("canonical start offset {}", offset);
    points.rotate_left(offset);
    Ok(points)
}
