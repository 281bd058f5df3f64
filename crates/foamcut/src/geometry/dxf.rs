//! DXF import.
//!
//! Reads the ENTITIES section of an ASCII DXF drawing. LINE, CIRCLE, ARC and
//! LWPOLYLINE (including bulge arcs) become one contour each; every other
//! entity is skipped. DXF is already Y-up, so coordinates are used as drawn.

use crate::geometry::segment::{RawContour, Segment};
use crate::geometry::shape::{path_to_segments, ShapeGeometry, ARC_TOLERANCE};
use anyhow::{anyhow, bail, Context, Result};
use kurbo::{Arc, Point, Shape as KurboShape, Vec2};
use std::fs;
use std::path::Path as StdPath;
use tracing::debug;

/// Bulges smaller than this are straight edges.
const MIN_BULGE: f64 = 1e-9;

/// Import a DXF file as raw contours in the machine frame.
pub fn import_dxf<P: AsRef<StdPath>>(path: P) -> Result<Vec<RawContour>> {
    let dxf_path = path.as_ref();
    let text = fs::read_to_string(dxf_path)
        .with_context(|| format!("Failed to read DXF {}", dxf_path.display()))?;
    import_dxf_str(&text).with_context(|| format!("Failed to import DXF {}", dxf_path.display()))
}

/// Import DXF document text.
pub fn import_dxf_str(text: &str) -> Result<Vec<RawContour>> {
    let groups = parse_groups(text)?;
    let entities = entities_section(&groups)?;

    let mut contours = Vec::new();
    let mut skipped = 0usize;
    for entity in &entities {
        let tag = format!("{}#{}", entity.layer(), contours.len());
        match entity.to_raw_contour(tag)? {
            Some(contour) => contours.push(contour),
            None => {
                debug!(kind = entity.kind, "skipping DXF entity");
                skipped += 1;
            }
        }
    }

    debug!(
        entities = entities.len(),
        contours = contours.len(),
        skipped,
        "imported DXF"
    );
    Ok(contours)
}

/// A group code and its value line.
#[derive(Debug, Clone, Copy)]
struct Group<'a> {
    code: i32,
    value: &'a str,
}

fn parse_groups(text: &str) -> Result<Vec<Group<'_>>> {
    let mut groups = Vec::new();
    let mut lines = text.lines().enumerate();
    while let Some((line_no, code)) = lines.next() {
        let code = code.trim();
        if code.is_empty() {
            continue;
        }
        let code: i32 = code
            .parse()
            .with_context(|| format!("Bad group code '{}' on line {}", code, line_no + 1))?;
        let (_, value) = lines
            .next()
            .ok_or_else(|| anyhow!("Group code {} on line {} has no value", code, line_no + 1))?;
        let value = value.trim();
        groups.push(Group { code, value });
        if code == 0 && value == "EOF" {
            break;
        }
    }
    Ok(groups)
}

/// One entity: its type name and the groups that follow it.
#[derive(Debug)]
struct Entity<'a> {
    kind: &'a str,
    groups: Vec<Group<'a>>,
}

fn entities_section<'a>(groups: &[Group<'a>]) -> Result<Vec<Entity<'a>>> {
    let start = groups
        .windows(2)
        .position(|w| {
            w[0].code == 0 && w[0].value == "SECTION" && w[1].code == 2 && w[1].value == "ENTITIES"
        })
        .ok_or_else(|| anyhow!("DXF has no ENTITIES section"))?;

    let mut entities: Vec<Entity<'a>> = Vec::new();
    for group in &groups[start + 2..] {
        if group.code == 0 {
            if group.value == "ENDSEC" {
                return Ok(entities);
            }
            entities.push(Entity {
                kind: group.value,
                groups: Vec::new(),
            });
        } else if let Some(entity) = entities.last_mut() {
            entity.groups.push(*group);
        }
    }
    bail!("ENTITIES section is not terminated")
}

impl<'a> Entity<'a> {
    fn layer(&self) -> &'a str {
        self.groups
            .iter()
            .find(|g| g.code == 8)
            .map(|g| g.value)
            .unwrap_or("0")
    }

    fn number(&self, code: i32) -> Result<f64> {
        let group = self
            .groups
            .iter()
            .find(|g| g.code == code)
            .ok_or_else(|| anyhow!("{} is missing group {}", self.kind, code))?;
        parse_number(group)
    }

    fn point(&self, x_code: i32) -> Result<Point> {
        Ok(Point::new(self.number(x_code)?, self.number(x_code + 10)?))
    }

    fn to_raw_contour(&self, tag: String) -> Result<Option<RawContour>> {
        let shape = match self.kind {
            "LINE" => ShapeGeometry::Line {
                from: self.point(10)?,
                to: self.point(11)?,
            },
            "CIRCLE" => ShapeGeometry::Circle {
                center: self.point(10)?,
                radius: self.number(40)?,
            },
            "ARC" => ShapeGeometry::Arc {
                center: self.point(10)?,
                radius: self.number(40)?,
                start_angle: self.number(50)?,
                end_angle: self.number(51)?,
            },
            "LWPOLYLINE" => return self.lwpolyline(tag).map(Some),
            _ => return Ok(None),
        };
        Ok(Some(shape.to_raw_contour(tag)))
    }

    fn lwpolyline(&self, tag: String) -> Result<RawContour> {
        let flags = match self.groups.iter().find(|g| g.code == 70) {
            Some(group) => parse_number(group)? as i64,
            None => 0,
        };
        let closed = flags & 1 == 1;

        // each vertex opens with its X; bulge (42) belongs to the current vertex
        let mut vertices: Vec<(Point, f64)> = Vec::new();
        for group in &self.groups {
            match group.code {
                10 => vertices.push((Point::new(parse_number(group)?, 0.0), 0.0)),
                20 => {
                    let vertex = vertices
                        .last_mut()
                        .ok_or_else(|| anyhow!("LWPOLYLINE Y before X"))?;
                    vertex.0.y = parse_number(group)?;
                }
                42 => {
                    let vertex = vertices
                        .last_mut()
                        .ok_or_else(|| anyhow!("LWPOLYLINE bulge before vertex"))?;
                    vertex.1 = parse_number(group)?;
                }
                _ => {}
            }
        }

        let n = vertices.len();
        let edges = if closed { n } else { n.saturating_sub(1) };
        let mut segments = Vec::with_capacity(edges);
        for i in 0..edges {
            let (from, bulge) = vertices[i];
            let (to, _) = vertices[(i + 1) % n];
            if from == to {
                continue;
            }
            if bulge.abs() < MIN_BULGE {
                segments.push(Segment::line(from, to));
            } else {
                let arc = bulge_arc(from, to, bulge);
                segments.extend(path_to_segments(arc.path_elements(ARC_TOLERANCE)));
            }
        }
        Ok(RawContour::new(tag, segments, closed))
    }
}

fn parse_number(group: &Group<'_>) -> Result<f64> {
    group
        .value
        .parse()
        .with_context(|| format!("Group {} value '{}' is not a number", group.code, group.value))
}

/// Arc from `from` to `to` for a polyline bulge.
///
/// The bulge is tan(sweep / 4); positive sweeps run counter-clockwise.
fn bulge_arc(from: Point, to: Point, bulge: f64) -> Arc {
    let chord = to - from;
    let length = chord.hypot();
    let sweep = 4.0 * bulge.atan();
    let radius = length / (2.0 * (sweep.abs() / 2.0).sin());

    let left = Vec2::new(-chord.y, chord.x) / length;
    let apothem = length / 2.0 * (1.0 - bulge * bulge) / (2.0 * bulge);
    let center = from.midpoint(to) + left * apothem;

    let start = from - center;
    Arc {
        center,
        radii: Vec2::new(radius, radius),
        start_angle: start.y.atan2(start.x),
        sweep_angle: sweep,
        x_rotation: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{flatten, signed_area};

    fn drawing(entities: &str) -> String {
        format!("0\nSECTION\n2\nENTITIES\n{}0\nENDSEC\n0\nEOF\n", entities)
    }

    const SLOT: &str = "0\nLWPOLYLINE\n8\nCUT\n90\n4\n70\n1\n\
        10\n0.0\n20\n0.0\n\
        10\n10.0\n20\n0.0\n42\n1.0\n\
        10\n10.0\n20\n4.0\n\
        10\n0.0\n20\n4.0\n42\n1.0\n";

    #[test]
    fn test_entities_become_contours() {
        let text = drawing(
            "0\nLINE\n8\n0\n10\n0\n20\n0\n11\n5\n21\n5\n\
             0\nCIRCLE\n8\nHOLES\n10\n20\n20\n20\n40\n3\n\
             0\nARC\n10\n0\n20\n0\n40\n2\n50\n0\n51\n90\n\
             0\nTEXT\n1\nignored\n",
        );
        let contours = import_dxf_str(&text).expect("import");
        assert_eq!(contours.len(), 3);
        assert_eq!(contours[0].tag, "0#0");
        assert!(!contours[0].closed);
        assert_eq!(contours[1].tag, "HOLES#1");
        assert!(contours[1].closed);
        assert!(!contours[2].closed);
    }

    #[test]
    fn test_bulged_polyline_is_rounded_slot() {
        let contours = import_dxf_str(&drawing(SLOT)).expect("import");
        assert_eq!(contours.len(), 1);
        let slot = &contours[0];
        assert_eq!(slot.tag, "CUT#0");
        assert!(slot.closed);

        let flat = flatten(slot, 0.001).expect("flatten");
        let pts = flat.contour.points();
        let max_x = pts.iter().map(|p| p.x).fold(f64::MIN, f64::max);
        let min_x = pts.iter().map(|p| p.x).fold(f64::MAX, f64::min);
        assert!((max_x - 12.0).abs() < 0.01, "{max_x}");
        assert!((min_x + 2.0).abs() < 0.01, "{min_x}");
        // 10x4 rectangle plus two half circles of radius 2, counter-clockwise
        let area = signed_area(pts);
        assert!((area - (40.0 + 4.0 * std::f64::consts::PI)).abs() < 0.1, "{area}");
    }

    #[test]
    fn test_negative_bulge_turns_clockwise() {
        let arc = bulge_arc(Point::new(0.0, 0.0), Point::new(2.0, 0.0), -1.0);
        assert!((arc.center - Point::new(1.0, 0.0)).hypot() < 1e-12);
        assert!(arc.sweep_angle < 0.0);
        // clockwise from (0,0) to (2,0) passes over the top
        let mid = arc.center + Vec2::from_angle(arc.start_angle + arc.sweep_angle / 2.0);
        assert!((mid - Point::new(1.0, 1.0)).hypot() < 1e-12);
    }

    #[test]
    fn test_missing_entities_section_is_error() {
        assert!(import_dxf_str("0\nSECTION\n2\nHEADER\n0\nENDSEC\n0\nEOF\n").is_err());
        assert!(import_dxf_str("zero\nLINE\n").is_err());
    }

    #[test]
    fn test_circle_missing_radius_is_error() {
        let text = drawing("0\nCIRCLE\n10\n0\n20\n0\n");
        assert!(import_dxf_str(&text).is_err());
    }
}
