//! Tool-radius compensation.
//!
//! Each vertex is pushed along the bisector of its two edge normals, scaled so
//! both adjacent offset edges sit exactly `tool_radius` from the originals
//! (a miter join). The side is always the right-hand side of the traversal:
//! outside for counter-clockwise outer boundaries, into the void for clockwise
//! holes. This is not a true offset curve; loops it creates are removed on a
//! best-effort basis and any crossing left over is reported.

use crate::error::ToolpathError;
use crate::geometry::contour::{OffsetContour, PolyContour};
use crate::geometry::signed_area;
use kurbo::{Point, Vec2};
use tracing::{debug, warn};

/// Offset edges shorter than `COLLAPSE_RATIO * tool_radius` mark a collapse.
pub const COLLAPSE_RATIO: f64 = 0.1;

/// Cosine floor for miters on left turns; limits a spike to 4x the radius.
const MIN_MITER_COS: f64 = 0.25;

/// How many edges ahead the loop cleanup looks for a crossing.
const LOOP_LOOKAHEAD: usize = 8;

const INTERSECT_EPSILON: f64 = 1e-9;

/// Compensate `contour` for a tool of radius `tool_radius`.
///
/// Open contours have no inside, so they are passed through uncompensated
/// and tagged outer.
pub fn offset(contour: &PolyContour, tool_radius: f64) -> Result<OffsetContour, ToolpathError> {
    if !contour.is_closed() {
        debug!(tag = %contour.tag(), "open contour cut on the line");
        return Ok(OffsetContour::uncompensated(contour));
    }

    let original = contour.points();
    let area = signed_area(original);
    if area.abs() <= f64::EPSILON {
        return Err(collapsed(contour, "contour encloses no area"));
    }
    let is_outer = area > 0.0;

    if tool_radius <= 0.0 {
        return Ok(OffsetContour::new(contour, original.to_vec(), is_outer, false));
    }

    let mut points = miter_offset(original, tool_radius);

    // Only an inward offset can shrink past the inradius.
    if !is_outer && reversed_perimeter(original, &points) {
        return Err(collapsed(contour, "offset edges run against the original edges"));
    }

    let removed = remove_tiny_loops(&mut points, tool_radius);
    if removed > 0 {
        debug!(tag = %contour.tag(), removed, "spliced tiny loops out of offset");
    }

    if points.len() < 3 {
        return Err(collapsed(contour, "fewer than 3 points remain"));
    }

    let min_edge = COLLAPSE_RATIO * tool_radius;
    let n = points.len();
    for i in 0..n {
        let d = points[i].distance(points[(i + 1) % n]);
        if d < min_edge {
            return Err(collapsed(
                contour,
                &format!("edge {} is {:.4} long, below {:.4}", i, d, min_edge),
            ));
        }
    }

    if signed_area(&points).signum() != area.signum() {
        return Err(collapsed(contour, "offset reversed the winding"));
    }

    let self_intersecting = has_self_intersection(&points);
    if self_intersecting {
        warn!(tag = %contour.tag(), "offset contour still crosses itself");
    }

    debug!(
        tag = %contour.tag(),
        is_outer,
        points = points.len(),
        "offset contour"
    );

    Ok(OffsetContour::new(contour, points, is_outer, self_intersecting))
}

fn collapsed(contour: &PolyContour, reason: &str) -> ToolpathError {
    ToolpathError::Collapsed {
        tag: contour.tag().to_string(),
        reason: reason.to_string(),
    }
}

/// Right-hand normal of a unit direction.
fn right_normal(dir: Vec2) -> Vec2 {
    Vec2::new(dir.y, -dir.x)
}

fn miter_offset(points: &[Point], distance: f64) -> Vec<Point> {
    let n = points.len();
    (0..n)
        .map(|i| {
            let prev = points[(i + n - 1) % n];
            let curr = points[i];
            let next = points[(i + 1) % n];

            let v1 = curr - prev;
            let v2 = next - curr;
            let e1 = v1.normalize();
            let e2 = v2.normalize();
            let n1 = right_normal(e1);
            let n2 = right_normal(e2);

            let sum = n1 + n2;
            if sum.hypot() < 1e-12 {
                // Edge doubles straight back; no bisector exists.
                return curr + n1 * distance;
            }
            let bisector = sum.normalize();
            let mut cos = bisector.dot(n1);
            let turn = e1.cross(e2);
            // A left turn opens the offset side; cap how far that miter reaches.
            if turn > 0.0 {
                cos = cos.max(MIN_MITER_COS);
            }
            let mut reach = distance / cos;
            // A right turn folds the offset side. Past the longer adjacent
            // edge the miter point no longer belongs to either edge.
            if turn < 0.0 {
                let along = bisector.dot(e1).abs();
                if along > INTERSECT_EPSILON {
                    let limit = v1.hypot().max(v2.hypot()) / along;
                    reach = reach.min(limit.max(distance));
                }
            }
            curr + bisector * reach
        })
        .collect()
}

/// True when the offset perimeter as a whole runs backwards, which is what an
/// inward offset past the inradius looks like.
fn reversed_perimeter(original: &[Point], offset: &[Point]) -> bool {
    let n = original.len();
    let agreement: f64 = (0..n)
        .map(|i| {
            let a = original[(i + 1) % n] - original[i];
            let b = offset[(i + 1) % n] - offset[i];
            a.dot(b)
        })
        .sum();
    agreement <= 0.0
}

/// Splice out small loops where nearby offset edges cross each other.
///
/// Looks a few edges ahead of every edge. When two edges cross and all the
/// points between them lie within `max_extent` of the crossing, the run is
/// replaced by the crossing point. Returns the number of loops removed.
fn remove_tiny_loops(points: &mut Vec<Point>, max_extent: f64) -> usize {
    let mut removed = 0;
    let mut i = 0;
    while i + 2 < points.len() {
        let n = points.len();
        let mut spliced = false;
        let last = (i + 1 + LOOP_LOOKAHEAD).min(n);
        for j in (i + 2)..last {
            if i == 0 && j == n - 1 {
                // closing edge touches edge 0
                continue;
            }
            let Some(x) = segment_intersection(points[i], points[i + 1], points[j], points[(j + 1) % n])
            else {
                continue;
            };
            let tiny = points[i + 1..=j].iter().all(|p| p.distance(x) < max_extent);
            if tiny && n - (j - i) + 1 >= 3 {
                points.splice(i + 1..=j, std::iter::once(x));
                removed += 1;
                spliced = true;
                break;
            }
        }
        if !spliced {
            i += 1;
        }
    }
    removed
}

/// True if any two non-adjacent edges of the closed polygon cross.
pub(crate) fn has_self_intersection(points: &[Point]) -> bool {
    let n = points.len();
    if n < 4 {
        return false;
    }
    for i in 0..n {
        let a0 = points[i];
        let a1 = points[(i + 1) % n];
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            let (b0, b1) = (points[j], points[(j + 1) % n]);
            if segment_intersection(a0, a1, b0, b1).is_some() || collinear_overlap(a0, a1, b0, b1) {
                return true;
            }
        }
    }
    false
}

/// Crossing point of two segments, excluding touches at their end points.
fn segment_intersection(a0: Point, a1: Point, b0: Point, b1: Point) -> Option<Point> {
    let r = a1 - a0;
    let s = b1 - b0;
    let denom = r.cross(s);
    if denom.abs() < INTERSECT_EPSILON {
        return None;
    }
    let qp = b0 - a0;
    let t = qp.cross(s) / denom;
    let u = qp.cross(r) / denom;
    let inside = |v: f64| v > INTERSECT_EPSILON && v < 1.0 - INTERSECT_EPSILON;
    if inside(t) && inside(u) {
        Some(a0 + r * t)
    } else {
        None
    }
}

/// True when two segments lie on one line and share a stretch of it.
fn collinear_overlap(a0: Point, a1: Point, b0: Point, b1: Point) -> bool {
    let r = a1 - a0;
    let len_sq = r.hypot2();
    if len_sq < INTERSECT_EPSILON * INTERSECT_EPSILON {
        return false;
    }
    let len = len_sq.sqrt();
    let off_line = |p: Point| (r.cross(p - a0) / len).abs() > INTERSECT_EPSILON;
    if off_line(b0) || off_line(b1) {
        return false;
    }
    let t0 = r.dot(b0 - a0) / len_sq;
    let t1 = r.dot(b1 - a0) / len_sq;
    let shared = t0.max(t1).min(1.0) - t0.min(t1).max(0.0);
    shared > INTERSECT_EPSILON
}
