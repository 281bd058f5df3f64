use kurbo::Point;

pub mod contour;
pub mod coords;
pub mod dxf;
pub mod flatten;
pub mod ids;
pub mod offset;
pub mod segment;
pub mod shape;
pub mod svg;

// Re-export public types
pub use contour::{OffsetContour, PolyContour};
pub use coords::SurfaceTransform;
pub use dxf::{import_dxf, import_dxf_str};
pub use flatten::{flatten, flatten_with, FlattenSettings, Flattened, MAX_SUBDIVISION_DEPTH};
pub use ids::ContourId;
pub use offset::{offset, COLLAPSE_RATIO};
pub use segment::{RawContour, Segment, SegmentKind};
pub use shape::ShapeGeometry;
pub use svg::{import_svg, import_svg_data};

/// Shoelace area of a closed point sequence.
///
/// Positive for counter-clockwise order (Y up), negative for clockwise.
/// The closing edge from the last point back to the first is implied.
pub fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

/// Smallest X coordinate, or `+inf` for an empty slice.
pub fn min_x(points: &[Point]) -> f64 {
    points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min)
}

/// Index of the vertex with the smallest Y. Ties go to the lowest index.
pub fn lowest_point_index(points: &[Point]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, p) in points.iter().enumerate() {
        match best {
            Some((_, y)) if p.y >= y => {}
            _ => best = Some((i, p.y)),
        }
    }
    best.map(|(i, _)| i)
}

/// Index of the vertex closest to `target`. Ties go to the lowest index.
pub fn nearest_point_index(points: &[Point], target: Point) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, p) in points.iter().enumerate() {
        let d = p.distance(target);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}
