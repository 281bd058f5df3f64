//! Curve flattening.
//!
//! Quadratic and cubic segments are bisected at `t = 0.5` until the distance
//! from every interior control point to the chord drops below the tolerance.
//! That distance bounds the deviation of the curve (convex hull property), so
//! the result stays within tolerance without ever evaluating the curve.

use crate::error::{ToolpathError, Warning, WarningKind};
use crate::geometry::contour::{PolyContour, COINCIDENT_EPSILON};
use crate::geometry::segment::RawContour;
use kurbo::{Line, ParamCurve, PathSeg, Point};
use tracing::{debug, warn};

/// Bisection depth after which a curve is emitted as a plain chord.
pub const MAX_SUBDIVISION_DEPTH: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlattenSettings {
    pub tolerance: f64,
    /// Adjacent output points closer than this are merged.
    pub merge_epsilon: f64,
    pub max_depth: u32,
}

impl FlattenSettings {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            merge_epsilon: 1e-6,
            max_depth: MAX_SUBDIVISION_DEPTH,
        }
    }
}

/// A flattened contour plus the warnings raised while producing it.
#[derive(Debug, Clone)]
pub struct Flattened {
    pub contour: PolyContour,
    pub warnings: Vec<Warning>,
}

/// Flatten `raw` with default merge epsilon and depth cap.
pub fn flatten(raw: &RawContour, tolerance: f64) -> Result<Flattened, ToolpathError> {
    flatten_with(raw, &FlattenSettings::new(tolerance))
}

pub fn flatten_with(
    raw: &RawContour,
    settings: &FlattenSettings,
) -> Result<Flattened, ToolpathError> {
    let mut out = PointSink::new(settings.merge_epsilon);
    let mut capped_segments = 0usize;

    for segment in &raw.segments {
        let seg = segment.to_path_seg(&raw.tag)?;
        out.push(seg.start());
        match seg {
            PathSeg::Line(line) => out.push(line.p1),
            curve => {
                if subdivide(curve, settings, 0, &mut out) {
                    capped_segments += 1;
                }
            }
        }
    }

    let mut points = out.points;
    if raw.closed && points.len() > 1 {
        let first = points[0];
        if let Some(last) = points.last() {
            if last.distance(first) <= merge_threshold(settings.merge_epsilon) {
                points.pop();
            }
        }
    }

    let contour = PolyContour::new(raw.tag.clone(), points, raw.closed)?;

    let mut warnings = Vec::new();
    if capped_segments > 0 {
        warn!(
            tag = %raw.tag,
            capped_segments,
            "curve subdivision hit depth cap; emitted chords may exceed tolerance"
        );
        warnings.push(Warning::new(
            raw.tag.clone(),
            WarningKind::FlattenDepthLimit,
            format!(
                "{} curve segment(s) reached subdivision depth {} and may exceed tolerance {}",
                capped_segments, settings.max_depth, settings.tolerance
            ),
        ));
    }

    debug!(
        tag = %raw.tag,
        id = %contour.id(),
        segments = raw.segments.len(),
        points = contour.len(),
        "flattened contour"
    );

    Ok(Flattened { contour, warnings })
}

/// Emit the end points of `seg`'s chords. Returns true if the depth cap was hit.
fn subdivide(seg: PathSeg, settings: &FlattenSettings, depth: u32, out: &mut PointSink) -> bool {
    if flatness(&seg) < settings.tolerance {
        out.push(seg.end());
        return false;
    }
    if depth >= settings.max_depth {
        out.push(seg.end());
        return true;
    }
    let (left, right) = seg.subdivide();
    let left_capped = subdivide(left, settings, depth + 1, out);
    let right_capped = subdivide(right, settings, depth + 1, out);
    left_capped || right_capped
}

/// Largest distance from an interior control point to the chord.
fn flatness(seg: &PathSeg) -> f64 {
    let chord = Line::new(seg.start(), seg.end());
    match seg {
        PathSeg::Line(_) => 0.0,
        PathSeg::Quad(q) => distance_to_chord(q.p1, &chord),
        PathSeg::Cubic(c) => distance_to_chord(c.p1, &chord).max(distance_to_chord(c.p2, &chord)),
    }
}

fn distance_to_chord(p: Point, chord: &Line) -> f64 {
    let d = chord.p1 - chord.p0;
    let len = d.hypot();
    if len < f64::EPSILON {
        return p.distance(chord.p0);
    }
    (d.cross(p - chord.p0) / len).abs()
}

/// Points this close are one point, whatever the caller asked for; anything
/// nearer would be rejected as a zero-length edge.
fn merge_threshold(epsilon: f64) -> f64 {
    epsilon.max(COINCIDENT_EPSILON)
}

/// Collects points, dropping any that land on top of the previous one.
struct PointSink {
    points: Vec<Point>,
    epsilon: f64,
}

impl PointSink {
    fn new(epsilon: f64) -> Self {
        Self {
            points: Vec::new(),
            epsilon: merge_threshold(epsilon),
        }
    }

    fn push(&mut self, p: Point) {
        match self.points.last() {
            Some(last) if last.distance(p) <= self.epsilon => {}
            _ => self.points.push(p),
        }
    }
}
