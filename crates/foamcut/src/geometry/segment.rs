use crate::error::ToolpathError;
use kurbo::{CubicBez, Line, PathSeg, Point, QuadBez, Rect};
use serde::{Deserialize, Serialize};

/// The declared type of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    /// A straight line (2 points).
    Line,
    /// A quadratic Bézier (3 control points).
    Quad,
    /// A cubic Bézier (4 control points).
    Cubic,
}

impl SegmentKind {
    /// Number of control points the kind requires.
    pub fn required_points(self) -> usize {
        match self {
            SegmentKind::Line => 2,
            SegmentKind::Quad => 3,
            SegmentKind::Cubic => 4,
        }
    }
}

/// A curve primitive as handed over by geometry import.
///
/// The control points are kept as delivered; the count is checked when the
/// segment is turned into a curve, so malformed input surfaces as
/// [`ToolpathError::InvalidGeometry`] instead of a panic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub points: Vec<Point>,
}

impl Segment {
    pub fn line(p0: Point, p1: Point) -> Self {
        Self {
            kind: SegmentKind::Line,
            points: vec![p0, p1],
        }
    }

    pub fn quad(p0: Point, p1: Point, p2: Point) -> Self {
        Self {
            kind: SegmentKind::Quad,
            points: vec![p0, p1, p2],
        }
    }

    pub fn cubic(p0: Point, p1: Point, p2: Point, p3: Point) -> Self {
        Self {
            kind: SegmentKind::Cubic,
            points: vec![p0, p1, p2, p3],
        }
    }

    /// Convert to a kurbo segment, checking the control-point count.
    pub fn to_path_seg(&self, tag: &str) -> Result<PathSeg, ToolpathError> {
        let required = self.kind.required_points();
        if self.points.len() < required {
            return Err(ToolpathError::InvalidGeometry {
                tag: tag.to_string(),
                reason: format!(
                    "{:?} segment needs {} control points, got {}",
                    self.kind,
                    required,
                    self.points.len()
                ),
            });
        }

        let p = &self.points;
        Ok(match self.kind {
            SegmentKind::Line => PathSeg::Line(Line::new(p[0], p[1])),
            SegmentKind::Quad => PathSeg::Quad(QuadBez::new(p[0], p[1], p[2])),
            SegmentKind::Cubic => PathSeg::Cubic(CubicBez::new(p[0], p[1], p[2], p[3])),
        })
    }
}

impl From<PathSeg> for Segment {
    fn from(seg: PathSeg) -> Self {
        match seg {
            PathSeg::Line(l) => Segment::line(l.p0, l.p1),
            PathSeg::Quad(q) => Segment::quad(q.p0, q.p1, q.p2),
            PathSeg::Cubic(c) => Segment::cubic(c.p0, c.p1, c.p2, c.p3),
        }
    }
}

/// An imported outline: segments in drawing order plus a closed flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawContour {
    /// Where the contour came from (glyph, shape label). Diagnostics only.
    pub tag: String,
    pub segments: Vec<Segment>,
    pub closed: bool,
}

impl RawContour {
    pub fn new(tag: impl Into<String>, segments: Vec<Segment>, closed: bool) -> Self {
        Self {
            tag: tag.into(),
            segments,
            closed,
        }
    }

    /// Build a contour of line segments through `points`.
    ///
    /// For closed contours the closing edge back to the first point is added
    /// unless the last point already repeats it.
    pub fn from_polyline(tag: impl Into<String>, points: &[Point], closed: bool) -> Self {
        let mut segments: Vec<Segment> = points
            .windows(2)
            .map(|pair| Segment::line(pair[0], pair[1]))
            .collect();
        if closed && points.len() > 2 {
            let first = points[0];
            let last = points[points.len() - 1];
            if first != last {
                segments.push(Segment::line(last, first));
            }
        }
        Self::new(tag, segments, closed)
    }

    /// Bounding box of all control points, if there are any.
    pub fn bounding_box(&self) -> Option<Rect> {
        let mut points = self.segments.iter().flat_map(|s| s.points.iter());
        let first = points.next()?;
        Some(points.fold(Rect::from_points(*first, *first), |rect, p| {
            rect.union_pt(*p)
        }))
    }
}
