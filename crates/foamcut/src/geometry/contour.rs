use crate::error::ToolpathError;
use crate::geometry::ids::ContourId;
use crate::geometry::{min_x, signed_area};
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Points closer than this count as coincident.
pub const COINCIDENT_EPSILON: f64 = 1e-9;

/// A flattened outline.
///
/// Closure is implied by `closed`; the first point is never repeated at the
/// end. Consecutive points are distinct, and there are at least 3 points for a
/// closed contour and 2 for an open one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyContour {
    id: ContourId,
    tag: String,
    points: Vec<Point>,
    closed: bool,
}

impl PolyContour {
    /// Validate and build a contour.
    pub fn new(
        tag: impl Into<String>,
        points: Vec<Point>,
        closed: bool,
    ) -> Result<Self, ToolpathError> {
        let tag = tag.into();
        let min_points = if closed { 3 } else { 2 };
        if points.len() < min_points {
            return Err(ToolpathError::InvalidGeometry {
                tag,
                reason: format!(
                    "{} contour needs at least {} points, got {}",
                    if closed { "closed" } else { "open" },
                    min_points,
                    points.len()
                ),
            });
        }

        let edge_count = if closed { points.len() } else { points.len() - 1 };
        for i in 0..edge_count {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            if a.distance(b) <= COINCIDENT_EPSILON {
                return Err(ToolpathError::InvalidGeometry {
                    tag,
                    reason: format!("points {} and {} coincide", i, (i + 1) % points.len()),
                });
            }
        }

        Ok(Self {
            id: ContourId::new(),
            tag,
            points,
            closed,
        })
    }

    pub fn id(&self) -> ContourId {
        self.id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shoelace area; zero for open contours.
    pub fn signed_area(&self) -> f64 {
        if self.closed {
            signed_area(&self.points)
        } else {
            0.0
        }
    }
}

/// A tool-compensated contour, ready for ordering and planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OffsetContour {
    tag: String,
    points: Vec<Point>,
    closed: bool,
    is_outer: bool,
    source: ContourId,
    self_intersecting: bool,
}

impl OffsetContour {
    pub(crate) fn new(
        source: &PolyContour,
        points: Vec<Point>,
        is_outer: bool,
        self_intersecting: bool,
    ) -> Self {
        Self {
            tag: source.tag.clone(),
            points,
            closed: source.closed,
            is_outer,
            source: source.id,
            self_intersecting,
        }
    }

    /// Wrap a contour without tool compensation.
    ///
    /// The outer/inner tag is still measured from the point order, exactly as
    /// the offset engine does it.
    pub fn uncompensated(contour: &PolyContour) -> Self {
        let is_outer = !contour.closed || contour.signed_area() > 0.0;
        Self::new(contour, contour.points.clone(), is_outer, false)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_outer(&self) -> bool {
        self.is_outer
    }

    /// Id of the flattened contour this one was derived from.
    pub fn source(&self) -> ContourId {
        self.source
    }

    /// True when loop cleanup left a self-crossing behind.
    pub fn has_unresolved_self_intersection(&self) -> bool {
        self.self_intersecting
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn min_x(&self) -> f64 {
        min_x(&self.points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_needs_three_points() {
        let err = PolyContour::new(
            "line",
            vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)],
            true,
        )
        .unwrap_err();
        assert!(matches!(err, ToolpathError::InvalidGeometry { .. }));
    }

    #[test]
    fn test_open_two_points_ok() {
        let contour = PolyContour::new(
            "line",
            vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)],
            false,
        )
        .expect("valid");
        assert_eq!(contour.len(), 2);
        assert_eq!(contour.signed_area(), 0.0);
    }

    #[test]
    fn test_coincident_points_rejected() {
        let result = PolyContour::new(
            "dup",
            vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(0.0, 1.0),
            ],
            true,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_closing_edge_checked() {
        let result = PolyContour::new(
            "wrap",
            vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(0.0, 1.0),
                Point::new(0.0, 0.0),
            ],
            true,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_uncompensated_measures_orientation() {
        let ccw = PolyContour::new(
            "ccw",
            vec![
                Point::new(0.0, 0.0),
                Point::new(4.0, 0.0),
                Point::new(4.0, 4.0),
            ],
            true,
        )
        .expect("valid");
        let offset = OffsetContour::uncompensated(&ccw);
        assert!(offset.is_outer());
        assert_eq!(offset.source(), ccw.id());
        assert_eq!(offset.points(), ccw.points());

        let mut reversed = ccw.points().to_vec();
        reversed.reverse();
        let cw = PolyContour::new("cw", reversed, true).expect("valid");
        assert!(!OffsetContour::uncompensated(&cw).is_outer());
    }
}
