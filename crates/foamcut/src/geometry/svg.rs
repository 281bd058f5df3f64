use crate::geometry::coords::SurfaceTransform;
use crate::geometry::segment::RawContour;
use crate::geometry::shape::path_to_segments;
use anyhow::{anyhow, Context, Result};
use kurbo::{BezPath, PathEl, Point};
use std::fs;
use std::path::Path as StdPath;
use tracing::debug;

/// Import an SVG file as raw contours in the machine frame.
///
/// Each subpath of each visible path becomes one contour. SVG is Y-down, so
/// coordinates are mirrored about the document height on the way in.
pub fn import_svg<P: AsRef<StdPath>>(path: P) -> Result<Vec<RawContour>> {
    let svg_path = path.as_ref();
    let data = fs::read(svg_path)
        .with_context(|| format!("Failed to read SVG {}", svg_path.display()))?;
    import_svg_data(&data)
        .with_context(|| format!("Failed to import SVG {}", svg_path.display()))
}

/// Import SVG document bytes.
pub fn import_svg_data(data: &[u8]) -> Result<Vec<RawContour>> {
    let opt = usvg::Options::default();
    let tree =
        usvg::Tree::from_data(data, &opt).map_err(|err| anyhow!("Failed to parse SVG: {}", err))?;

    let transform = SurfaceTransform::new(tree.size().height() as f64);
    let mut contours = Vec::new();
    let mut path_count = 0;
    collect_group(tree.root(), &transform, &mut path_count, &mut contours);

    debug!(paths = path_count, contours = contours.len(), "imported SVG");
    Ok(contours)
}

/// Recursively collect contours from a usvg Group.
fn collect_group(
    group: &usvg::Group,
    transform: &SurfaceTransform,
    path_count: &mut usize,
    contours: &mut Vec<RawContour>,
) {
    for node in group.children() {
        match node {
            usvg::Node::Group(g) => {
                collect_group(g, transform, path_count, contours);
            }
            usvg::Node::Path(path) => {
                if !path.is_visible() {
                    continue;
                }

                let bezpath = convert_tiny_skia_to_kurbo(path.data(), transform);
                if bezpath.elements().is_empty() {
                    continue;
                }

                *path_count += 1;
                let label = if path.id().is_empty() {
                    format!("Path {}", path_count)
                } else {
                    path.id().to_string()
                };

                for (index, subpath) in split_subpaths(&bezpath).into_iter().enumerate() {
                    let closed = matches!(subpath.last(), Some(PathEl::ClosePath));
                    let segments = path_to_segments(subpath);
                    if segments.is_empty() {
                        continue;
                    }
                    contours.push(RawContour::new(
                        format!("{}#{}", label, index),
                        segments,
                        closed,
                    ));
                }
            }
            usvg::Node::Image(_) => {
                // Images carry no outlines to cut
            }
            usvg::Node::Text(_) => {
                // Text nodes are already converted to paths by usvg
            }
        }
    }
}

/// Split a path at every MoveTo.
fn split_subpaths(path: &BezPath) -> Vec<Vec<PathEl>> {
    let mut subpaths: Vec<Vec<PathEl>> = Vec::new();
    for el in path.elements() {
        if matches!(el, PathEl::MoveTo(_)) || subpaths.is_empty() {
            subpaths.push(Vec::new());
        }
        if let Some(current) = subpaths.last_mut() {
            current.push(*el);
        }
    }
    subpaths
}

/// Convert a tiny_skia_path to a kurbo BezPath in the machine frame.
fn convert_tiny_skia_to_kurbo(
    path: &tiny_skia_path::Path,
    transform: &SurfaceTransform,
) -> BezPath {
    let to_machine =
        |p: tiny_skia_path::Point| transform.from_surface(Point::new(p.x as f64, p.y as f64));
    let mut bezpath = BezPath::new();

    for segment in path.segments() {
        match segment {
            tiny_skia_path::PathSegment::MoveTo(p) => {
                bezpath.move_to(to_machine(p));
            }
            tiny_skia_path::PathSegment::LineTo(p) => {
                bezpath.line_to(to_machine(p));
            }
            tiny_skia_path::PathSegment::QuadTo(p1, p2) => {
                bezpath.quad_to(to_machine(p1), to_machine(p2));
            }
            tiny_skia_path::PathSegment::CubicTo(p1, p2, p3) => {
                bezpath.curve_to(to_machine(p1), to_machine(p2), to_machine(p3));
            }
            tiny_skia_path::PathSegment::Close => {
                bezpath.close_path();
            }
        }
    }

    bezpath
}
