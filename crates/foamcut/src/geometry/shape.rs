use crate::geometry::segment::{RawContour, Segment};
use kurbo::{Arc, Circle, PathEl, Point, Shape as KurboShape, Vec2};
use serde::{Deserialize, Serialize};

/// Accuracy of the Bézier approximation used for circles and arcs.
pub(crate) const ARC_TOLERANCE: f64 = 1e-3;

/// Geometry of a shape as stored in a job file.
///
/// Mirrors the primitive records CAD imports produce. Every variant turns
/// into exactly one [`RawContour`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShapeGeometry {
    /// A single straight cut.
    Line { from: Point, to: Point },
    /// Vertices joined by straight lines.
    Polyline {
        points: Vec<Point>,
        #[serde(default = "default_true")]
        closed: bool,
    },
    /// Axis-aligned rectangle between two corners.
    Rectangle { min: Point, max: Point },
    Circle { center: Point, radius: f64 },
    /// Counter-clockwise arc from `start_angle` to `end_angle`, in degrees.
    Arc {
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
    },
    /// Pre-built segments, e.g. from a glyph outline.
    Path {
        segments: Vec<Segment>,
        #[serde(default = "default_true")]
        closed: bool,
    },
}

fn default_true() -> bool {
    true
}

impl ShapeGeometry {
    pub fn is_closed(&self) -> bool {
        match self {
            ShapeGeometry::Line { .. } | ShapeGeometry::Arc { .. } => false,
            ShapeGeometry::Rectangle { .. } | ShapeGeometry::Circle { .. } => true,
            ShapeGeometry::Polyline { closed, .. } | ShapeGeometry::Path { closed, .. } => *closed,
        }
    }

    /// Convert to an importable contour tagged with `tag`.
    pub fn to_raw_contour(&self, tag: impl Into<String>) -> RawContour {
        let tag = tag.into();
        match self {
            ShapeGeometry::Line { from, to } => {
                RawContour::new(tag, vec![Segment::line(*from, *to)], false)
            }
            ShapeGeometry::Polyline { points, closed } => {
                RawContour::from_polyline(tag, points, *closed)
            }
            ShapeGeometry::Rectangle { min, max } => {
                // counter-clockwise from the lower-left corner
                let corners = [
                    Point::new(min.x, min.y),
                    Point::new(max.x, min.y),
                    Point::new(max.x, max.y),
                    Point::new(min.x, max.y),
                ];
                RawContour::from_polyline(tag, &corners, true)
            }
            ShapeGeometry::Circle { center, radius } => {
                let circle = Circle::new(*center, *radius);
                RawContour::new(tag, path_to_segments(circle.path_elements(ARC_TOLERANCE)), true)
            }
            ShapeGeometry::Arc {
                center,
                radius,
                start_angle,
                end_angle,
            } => {
                let mut sweep = end_angle - start_angle;
                if sweep <= 0.0 {
                    sweep += 360.0;
                }
                let arc = Arc {
                    center: *center,
                    radii: Vec2::new(*radius, *radius),
                    start_angle: start_angle.to_radians(),
                    sweep_angle: sweep.to_radians(),
                    x_rotation: 0.0,
                };
                RawContour::new(tag, path_to_segments(arc.path_elements(ARC_TOLERANCE)), false)
            }
            ShapeGeometry::Path { segments, closed } => {
                RawContour::new(tag, segments.clone(), *closed)
            }
        }
    }
}

/// Convert path elements of a single subpath to segments.
pub(crate) fn path_to_segments(elements: impl IntoIterator<Item = PathEl>) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut start = Point::ZERO;
    let mut current = Point::ZERO;
    for el in elements {
        match el {
            PathEl::MoveTo(p) => {
                start = p;
                current = p;
            }
            PathEl::LineTo(p) => {
                segments.push(Segment::line(current, p));
                current = p;
            }
            PathEl::QuadTo(p1, p2) => {
                segments.push(Segment::quad(current, p1, p2));
                current = p2;
            }
            PathEl::CurveTo(p1, p2, p3) => {
                segments.push(Segment::cubic(current, p1, p2, p3));
                current = p3;
            }
            PathEl::ClosePath => {
                if current != start {
                    segments.push(Segment::line(current, start));
                }
                current = start;
            }
        }
    }
    segments
}
