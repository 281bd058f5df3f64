use crate::geometry::{lowest_point_index, nearest_point_index, signed_area, OffsetContour};
use crate::types::{MachiningParameters, ShapeMetadata};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One contour's complete cutting sequence.
///
/// `points` holds the optional lead-in, the contour body starting at the
/// chosen start vertex, and the optional lead-out. For closed contours the
/// move from the last body point back to the first is implied; the lead-out
/// leaves from the start vertex along that closing edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedPath {
    tag: String,
    points: Vec<Point>,
    body_start: usize,
    body_len: usize,
    closed: bool,
    is_outer: bool,
    entry: Option<Point>,
    exit: Option<Point>,
    annotations: Vec<String>,
}

impl PlannedPath {
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Lead-in, body and lead-out in cutting order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Index in [`points`](Self::points) where the lead-in ends and the body begins.
    pub fn body_start(&self) -> usize {
        self.body_start
    }

    pub fn body(&self) -> &[Point] {
        &self.points[self.body_start..self.body_start + self.body_len]
    }

    pub fn lead_in(&self) -> Option<Point> {
        (self.body_start > 0).then(|| self.points[0])
    }

    pub fn lead_out(&self) -> Option<Point> {
        let body_end = self.body_start + self.body_len;
        (self.points.len() > body_end).then(|| self.points[body_end])
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_outer(&self) -> bool {
        self.is_outer
    }

    /// Entry marker from shape metadata, if one was given and valid.
    pub fn entry(&self) -> Option<Point> {
        self.entry
    }

    /// Exit marker from shape metadata, if one was given and valid.
    pub fn exit(&self) -> Option<Point> {
        self.exit
    }

    /// Notes to carry into the program next to this contour.
    pub fn annotations(&self) -> &[String] {
        &self.annotations
    }

    pub(crate) fn annotate(&mut self, note: impl Into<String>) {
        self.annotations.push(note.into());
    }

    /// Where the tool is when this path is finished; feeds the next `plan` call.
    pub fn end_point(&self) -> Option<Point> {
        if let Some(out) = self.lead_out() {
            return Some(out);
        }
        let body = self.body();
        if self.closed {
            body.first().copied()
        } else {
            body.last().copied()
        }
    }
}

/// Plan the cut of one contour.
///
/// The start vertex is, in order of preference: a valid `metadata.start_index`,
/// the vertex nearest `prev_end`, or the lowest vertex. Closed contours are
/// rotated to begin there and then turned so outer boundaries run
/// counter-clockwise and holes clockwise, unless `metadata.clockwise` says
/// otherwise. Open contours can only start at one of their two ends.
pub fn plan(
    contour: &OffsetContour,
    prev_end: Option<Point>,
    metadata: Option<&ShapeMetadata>,
    params: &MachiningParameters,
) -> PlannedPath {
    let meta = metadata.copied().unwrap_or_default();
    let points = contour.points();
    let n = points.len();

    let requested_start = meta.checked_start(n).unwrap_or_else(|err| {
        debug!(tag = %contour.tag(), %err, "ignoring start override");
        None
    });

    let body = if contour.is_closed() {
        plan_closed(contour, requested_start, prev_end, meta.clockwise)
    } else {
        plan_open(points, requested_start, prev_end)
    };

    let marker = |index: Option<usize>| index.and_then(|i| points.get(i).copied());
    let entry = marker(meta.checked_entry(n).unwrap_or(None));
    let exit = marker(meta.checked_exit(n).unwrap_or(None));

    let lead_in = lead_in_point(&body, params.lead_length);
    let lead_out = lead_out_point(&body, contour.is_closed(), params.lead_length);

    let body_start = usize::from(lead_in.is_some());
    let body_len = body.len();
    let mut path_points = Vec::with_capacity(body_len + 2);
    path_points.extend(lead_in);
    path_points.extend(body);
    path_points.extend(lead_out);

    let mut annotations = Vec::new();
    if contour.has_unresolved_self_intersection() {
        annotations.push("offset still crosses itself; cut is best effort".to_string());
    }

    let planned = PlannedPath {
        tag: contour.tag().to_string(),
        points: path_points,
        body_start,
        body_len,
        closed: contour.is_closed(),
        is_outer: contour.is_outer(),
        entry,
        exit,
        annotations,
    };
    debug!(
        tag = %planned.tag,
        points = planned.points.len(),
        start = ?planned.body().first(),
        "planned contour"
    );
    planned
}

fn plan_closed(
    contour: &OffsetContour,
    requested_start: Option<usize>,
    prev_end: Option<Point>,
    clockwise: Option<bool>,
) -> Vec<Point> {
    let points = contour.points();
    let start = requested_start
        .or_else(|| prev_end.and_then(|p| nearest_point_index(points, p)))
        .or_else(|| lowest_point_index(points))
        .unwrap_or(0);

    let mut body = points.to_vec();
    body.rotate_left(start);

    let want_ccw = match clockwise {
        Some(cw) => !cw,
        None => contour.is_outer(),
    };
    if (signed_area(&body) > 0.0) != want_ccw {
        // keep the start vertex, flip the direction of travel
        body[1..].reverse();
    }
    body
}

fn plan_open(points: &[Point], requested_start: Option<usize>, prev_end: Option<Point>) -> Vec<Point> {
    let last = points.len().saturating_sub(1);
    let from_end = match requested_start {
        Some(i) if i == last => true,
        Some(0) => false,
        _ => match prev_end {
            Some(p) => points[last].distance(p) < points[0].distance(p),
            None => points[last].y < points[0].y,
        },
    };

    let mut body = points.to_vec();
    if from_end {
        body.reverse();
    }
    body
}

fn lead_in_point(body: &[Point], length: f64) -> Option<Point> {
    if body.len() < 2 || length <= 0.0 {
        return None;
    }
    let dir = body[1] - body[0];
    if dir.hypot() <= f64::EPSILON {
        return None;
    }
    Some(body[0] - dir.normalize() * length)
}

fn lead_out_point(body: &[Point], closed: bool, length: f64) -> Option<Point> {
    if body.len() < 2 || length <= 0.0 {
        return None;
    }
    let n = body.len();
    let (from, to) = if closed {
        (body[n - 1], body[0])
    } else {
        (body[n - 2], body[n - 1])
    };
    let dir = to - from;
    if dir.hypot() <= f64::EPSILON {
        return None;
    }
    Some(to + dir.normalize() * length)
}
