use crate::error::{ToolpathError, ToolpathResult, Warning, WarningKind};
use crate::geometry::{
    flatten_with, offset, ContourId, FlattenSettings, OffsetContour, RawContour,
    MAX_SUBDIVISION_DEPTH,
};
use crate::motion::{emit_annotated, MoveStream};
use crate::order::order;
use crate::planner::{plan, PlannedPath};
use crate::postprocessor::post_process;
use crate::types::{GCode, MachiningParameters, ShapeMetadata};
use kurbo::Point;
use rayon::prelude::*;
use std::collections::HashMap;
use tracing::{info, warn};

/// Title written as the first comment of a program when none is given.
pub const DEFAULT_TITLE: &str = "foamcut program";

/// Everything one compilation run produces.
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    pub gcode: GCode,
    pub stream: MoveStream,
    /// Planned paths in cutting order.
    pub paths: Vec<PlannedPath>,
    /// Per-contour diagnostics, in input order.
    pub warnings: Vec<Warning>,
}

/// Compile raw contours into a G-code program.
///
/// `metadata` is index-aligned with `contours`; missing entries use the
/// default policy. Only invalid parameters fail the run. Contours that cannot
/// be cut are skipped and reported in [`CompiledProgram::warnings`] and as
/// comments in the program.
pub fn compile(
    contours: &[RawContour],
    metadata: &[ShapeMetadata],
    params: &MachiningParameters,
) -> ToolpathResult<CompiledProgram> {
    compile_titled(contours, metadata, params, DEFAULT_TITLE)
}

pub fn compile_titled(
    contours: &[RawContour],
    metadata: &[ShapeMetadata],
    params: &MachiningParameters,
    title: &str,
) -> ToolpathResult<CompiledProgram> {
    params.validate()?;

    let settings = FlattenSettings {
        tolerance: params.curve_tolerance,
        merge_epsilon: params.merge_epsilon,
        max_depth: MAX_SUBDIVISION_DEPTH,
    };

    // Flatten and offset are independent per contour.
    let prepared: Vec<Prepared> = contours
        .par_iter()
        .map(|raw| prepare(raw, &settings, params.tool_radius))
        .collect();

    let mut warnings = Vec::new();
    let mut skipped = Vec::new();
    let mut notes: HashMap<ContourId, Vec<Warning>> = HashMap::new();
    let mut source_index: HashMap<ContourId, usize> = HashMap::new();
    let mut offsets = Vec::with_capacity(prepared.len());

    for (index, (raw, outcome)) in contours.iter().zip(prepared).enumerate() {
        warnings.extend(outcome.notes.iter().cloned());
        match outcome.result {
            Ok(contour) => {
                if contour.has_unresolved_self_intersection() {
                    let err = ToolpathError::UnresolvedSelfIntersection {
                        tag: contour.tag().to_string(),
                    };
                    warnings.extend(Warning::from_error(raw.tag.clone(), &err));
                }
                source_index.insert(contour.source(), index);
                notes.insert(contour.source(), outcome.notes);
                offsets.push(contour);
            }
            Err(err) => {
                warn!(tag = %raw.tag, %err, "skipping contour");
                if let Some(warning) = Warning::from_error(raw.tag.clone(), &err) {
                    warnings.push(warning.clone());
                    skipped.push(warning);
                }
                skipped.extend(outcome.notes);
            }
        }
    }

    let ordered = order(offsets);

    let mut paths = Vec::with_capacity(ordered.len());
    let mut prev_end: Option<Point> = None;
    for contour in &ordered {
        let meta = source_index
            .get(&contour.source())
            .and_then(|&index| metadata.get(index));
        let mut path = plan(contour, prev_end, meta, params);
        for note in notes.get(&contour.source()).into_iter().flatten() {
            path.annotate(note.message.clone());
        }
        prev_end = path.end_point().or(prev_end);
        paths.push(path);
    }

    let stream = emit_annotated(&paths, &skipped, title, params);
    let gcode = post_process(&stream);

    info!(
        contours = contours.len(),
        emitted = paths.len(),
        skipped = skipped.len(),
        warnings = warnings.len(),
        lines = gcode.lines.len(),
        "compiled program"
    );

    Ok(CompiledProgram {
        gcode,
        stream,
        paths,
        warnings,
    })
}

/// Outcome of the per-contour stages.
struct Prepared {
    result: ToolpathResult<OffsetContour>,
    notes: Vec<Warning>,
}

fn prepare(raw: &RawContour, settings: &FlattenSettings, tool_radius: f64) -> Prepared {
    match flatten_with(raw, settings) {
        Ok(flattened) => Prepared {
            result: offset(&flattened.contour, tool_radius),
            notes: flattened.warnings,
        },
        Err(err) => Prepared {
            result: Err(err),
            notes: Vec::new(),
        },
    }
}

/// Count warnings of one kind.
pub fn count_warnings(warnings: &[Warning], kind: WarningKind) -> usize {
    warnings.iter().filter(|w| w.kind == kind).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Segment;
    use crate::types::Move;

    fn square(tag: &str, x: f64, y: f64, size: f64, ccw: bool) -> RawContour {
        let mut pts = vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ];
        if !ccw {
            pts.reverse();
        }
        RawContour::from_polyline(tag, &pts, true)
    }

    #[test]
    fn test_invalid_parameters_fail_run() {
        let params = MachiningParameters {
            cut_feed_rate: 0.0,
            ..MachiningParameters::default()
        };
        let result = compile(&[square("a", 0.0, 0.0, 10.0, true)], &[], &params);
        assert!(matches!(result, Err(ToolpathError::Parameter(_))));
    }

    #[test]
    fn test_hole_cut_before_outer() {
        let contours = vec![
            square("outer", 0.0, 0.0, 40.0, true),
            square("hole", 10.0, 10.0, 10.0, false),
        ];
        let program = compile(&contours, &[], &MachiningParameters::default()).expect("compile");
        let tags: Vec<&str> = program.paths.iter().map(|p| p.tag()).collect();
        assert_eq!(tags, vec!["hole", "outer"]);
        assert!(program.warnings.is_empty());
    }

    #[test]
    fn test_malformed_contour_skipped_with_comment() {
        let bad = RawContour::new(
            "bad",
            vec![Segment {
                kind: crate::geometry::SegmentKind::Cubic,
                points: vec![Point::ZERO, Point::new(1.0, 1.0)],
            }],
            false,
        );
        let contours = vec![bad, square("good", 0.0, 0.0, 10.0, true)];
        let program = compile(&contours, &[], &MachiningParameters::default()).expect("compile");
        assert_eq!(program.paths.len(), 1);
        assert_eq!(count_warnings(&program.warnings, WarningKind::InvalidGeometry), 1);
        assert!(program
            .gcode
            .lines
            .iter()
            .any(|l| l.starts_with("; skipped bad:")));
    }

    #[test]
    fn test_skipped_contour_keeps_flatten_notes() {
        // fine enough chords that the offset edges fall below the collapse length
        let arch = RawContour::new(
            "arch",
            vec![
                Segment::quad(Point::new(0.0, 0.0), Point::new(5.0, 10.0), Point::new(10.0, 0.0)),
                Segment::line(Point::new(10.0, 0.0), Point::new(0.0, 0.0)),
            ],
            true,
        );
        let params = MachiningParameters {
            curve_tolerance: 1e-12,
            tool_radius: 1.0,
            ..MachiningParameters::default()
        };
        let program = compile(&[arch], &[], &params).expect("compile");
        assert!(program.paths.is_empty());
        assert_eq!(count_warnings(&program.warnings, WarningKind::Collapsed), 1);
        assert_eq!(count_warnings(&program.warnings, WarningKind::FlattenDepthLimit), 1);
        let skipped: Vec<&String> = program
            .gcode
            .lines
            .iter()
            .filter(|l| l.starts_with("; skipped arch:"))
            .collect();
        assert_eq!(skipped.len(), 2);
        assert!(skipped.iter().any(|l| l.contains("subdivision depth 16")));
    }

    #[test]
    fn test_metadata_follows_source_contour() {
        // ordering swaps the two contours; metadata must not
        let contours = vec![
            square("right", 20.0, 0.0, 10.0, true),
            square("left", 0.0, 0.0, 10.0, true),
        ];
        let metadata = vec![ShapeMetadata::default(), ShapeMetadata::with_start(2)];
        let params = MachiningParameters {
            tool_radius: 0.0,
            lead_length: 0.0,
            ..MachiningParameters::default()
        };
        let program = compile(&contours, &metadata, &params).expect("compile");
        assert_eq!(program.paths[0].tag(), "left");
        assert_eq!(program.paths[0].body()[0], Point::new(10.0, 10.0));
    }

    #[test]
    fn test_one_plunge_per_contour() {
        let contours = vec![
            square("a", 0.0, 0.0, 10.0, true),
            square("b", 20.0, 0.0, 10.0, true),
        ];
        let program = compile(&contours, &[], &MachiningParameters::default()).expect("compile");
        let plunges = program
            .stream
            .moves()
            .filter(|m| matches!(m, Move::Plunge { .. }))
            .count();
        assert_eq!(plunges, 2);
    }
}
