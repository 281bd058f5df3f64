use crate::geometry::OffsetContour;
use tracing::debug;

/// Put contours in cutting order: every hole before any outer boundary,
/// each group left to right by its smallest X.
///
/// Uses the outer/inner tag set by the offset engine. The sort is stable, so
/// contours with equal minimum X keep their input order and applying `order`
/// again changes nothing.
pub fn order(contours: Vec<OffsetContour>) -> Vec<OffsetContour> {
    let (mut inner, mut outer): (Vec<_>, Vec<_>) =
        contours.into_iter().partition(|c| !c.is_outer());

    inner.sort_by(|a, b| a.min_x().total_cmp(&b.min_x()));
    outer.sort_by(|a, b| a.min_x().total_cmp(&b.min_x()));

    debug!(inner = inner.len(), outer = outer.len(), "ordered contours");

    inner.extend(outer);
    inner
}
