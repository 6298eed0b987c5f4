//! Planar target described by a restricted SVG file.
//!
//! Only `rect` and `polygon` elements contribute vertices. Every other element
//! is ignored.

use std::path::Path;

use crate::error::{PoseError, Result};
use crate::io::read_text;

/// Markup element with its attributes in document order.
#[derive(Debug, Clone, PartialEq)]
struct Element<'a> {
    name: &'a str,
    attributes: Vec<(&'a str, &'a str)>,
}

impl<'a> Element<'a> {
    fn attribute(&self, key: &str) -> Option<&'a str> {
        self.attributes
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
    }
}

/// Splits markup into elements. Comments, processing instructions, doctype
/// declarations and closing tags produce nothing.
fn tokenize_elements(text: &str) -> Vec<Element<'_>> {
    let mut elements = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        rest = &rest[start + 1..];
        if let Some(after) = rest.strip_prefix("!--") {
            rest = match after.find("-->") {
                Some(end) => &after[end + 3..],
                None => "",
            };
            continue;
        }
        let end = rest.find('>').unwrap_or(rest.len());
        let body = &rest[..end];
        rest = if end < rest.len() { &rest[end + 1..] } else { "" };
        if body.starts_with(['?', '!', '/']) {
            continue;
        }
        if let Some(element) = parse_element(body.trim_end_matches('/')) {
            elements.push(element);
        }
    }
    elements
}

fn parse_element(body: &str) -> Option<Element<'_>> {
    let body = body.trim();
    let name_end = body
        .find(|c: char| c.is_whitespace())
        .unwrap_or(body.len());
    let name = &body[..name_end];
    if name.is_empty() {
        return None;
    }
    let mut attributes = Vec::new();
    let mut rest = body[name_end..].trim_start();
    while !rest.is_empty() {
        let key_end = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let key = &rest[..key_end];
        rest = rest[key_end..].trim_start();
        let Some(after_eq) = rest.strip_prefix('=') else {
            // bare attribute without a value
            attributes.push((key, ""));
            continue;
        };
        let after_eq = after_eq.trim_start();
        let (value, remaining) = match after_eq.chars().next() {
            Some(q @ ('"' | '\'')) => {
                let inner = &after_eq[1..];
                match inner.find(q) {
                    Some(close) => (&inner[..close], &inner[close + 1..]),
                    None => (inner, ""),
                }
            }
            _ => {
                let value_end = after_eq
                    .find(char::is_whitespace)
                    .unwrap_or(after_eq.len());
                (&after_eq[..value_end], &after_eq[value_end..])
            }
        };
        attributes.push((key, value));
        rest = remaining.trim_start();
    }
    Some(Element { name, attributes })
}

fn parse_number(text: &str, context: &str) -> Result<f32> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix("px").unwrap_or(trimmed);
    trimmed
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| PoseError::Parse(format!("{context}: invalid number {text:?}")))
}

fn push_unique(points: &mut Vec<glam::Vec2>, p: glam::Vec2) {
    if !points.contains(&p) {
        points.push(p);
    }
}

fn extract_rect(element: &Element, points: &mut Vec<glam::Vec2>) -> Result<()> {
    let optional = |key: &str| -> Result<f32> {
        element
            .attribute(key)
            .map(|v| parse_number(v, &format!("rect {key}")))
            .unwrap_or(Ok(0.0))
    };
    let required = |key: &str| -> Result<f32> {
        let v = element
            .attribute(key)
            .ok_or_else(|| PoseError::Parse(format!("rect without {key} attribute")))?;
        parse_number(v, &format!("rect {key}"))
    };
    let x = optional("x")?;
    let y = optional("y")?;
    let width = required("width")?;
    let height = required("height")?;
    push_unique(points, glam::Vec2::new(x, y));
    push_unique(points, glam::Vec2::new(x + width, y));
    push_unique(points, glam::Vec2::new(x, y + height));
    push_unique(points, glam::Vec2::new(x + width, y + height));
    Ok(())
}

fn extract_polygon(element: &Element, points: &mut Vec<glam::Vec2>) -> Result<()> {
    let raw = element
        .attribute("points")
        .ok_or_else(|| PoseError::Parse("polygon without points attribute".to_string()))?;
    let coords = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| parse_number(s, "polygon points"))
        .collect::<Result<Vec<f32>>>()?;
    if coords.len() % 2 != 0 {
        return Err(PoseError::Parse(format!(
            "polygon points has an odd number of coordinates ({})",
            coords.len()
        )));
    }
    for xy in coords.chunks_exact(2) {
        push_unique(points, glam::Vec2::new(xy[0], xy[1]));
    }
    Ok(())
}

/// Collects the distinct vertices of every `rect` and `polygon` element in
/// emission order.
pub fn extract_vertices(svg: &str) -> Result<Vec<glam::Vec2>> {
    let mut points = Vec::new();
    for element in tokenize_elements(svg) {
        match element.name {
            "rect" => extract_rect(&element, &mut points)?,
            "polygon" => extract_polygon(&element, &mut points)?,
            _ => {}
        }
    }
    Ok(points)
}

/// Clockwise angle of a vertex about the origin.
pub fn clockwise_angle(p: glam::Vec2) -> f32 {
    -p.x.atan2(-p.y)
}

/// Sorts vertices by [`clockwise_angle`]; equal angles keep their order.
pub fn reorder_clockwise(points: &mut [glam::Vec2]) {
    points.sort_by(|a, b| clockwise_angle(*a).total_cmp(&clockwise_angle(*b)));
}

/// Lifts template vertices onto the z = 0 plane, dividing by `scale`.
pub fn lift_to_object_space(points: &[glam::Vec2], scale: f64) -> Result<Vec<glam::Vec3>> {
    if scale == 0.0 || !scale.is_finite() {
        return Err(PoseError::Config(format!(
            "scale must be finite and non-zero, got {scale}"
        )));
    }
    Ok(points
        .iter()
        .map(|p| {
            glam::Vec3::new(
                (p.x as f64 / scale) as f32,
                (p.y as f64 / scale) as f32,
                0.0,
            )
        })
        .collect())
}

/// Ordered template polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub vertices: Vec<glam::Vec2>,
}

impl Template {
    /// Wraps vertices that are already in canonical order.
    pub fn new(vertices: Vec<glam::Vec2>) -> Template {
        Template { vertices }
    }

    pub fn from_svg_str(svg: &str) -> Result<Template> {
        let mut vertices = extract_vertices(svg)?;
        if vertices.is_empty() {
            return Err(PoseError::Parse(
                "template contains no rect or polygon vertices".to_string(),
            ));
        }
        reorder_clockwise(&mut vertices);
        log::debug!("template vertices {:?}", vertices);
        Ok(Template { vertices })
    }

    pub fn from_svg_file(path: impl AsRef<Path>) -> Result<Template> {
        let svg = read_text(path.as_ref())?;
        Self::from_svg_str(&svg)
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn object_points(&self, scale: f64) -> Result<Vec<glam::Vec3>> {
        lift_to_object_space(&self.vertices, scale)
    }
}
