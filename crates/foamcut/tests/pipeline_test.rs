use foamcut::*;
use kurbo::Point;
use std::path::PathBuf;

fn data_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

#[test]
fn test_svg_ring_cuts_hole_first() {
    let contours = import_svg(data_path("ring.svg")).expect("import ring");
    assert_eq!(contours.len(), 2);

    let program = compile(&contours, &[], &MachiningParameters::default()).expect("compile");
    assert!(program.warnings.is_empty());

    let tags: Vec<&str> = program.paths.iter().map(|p| p.tag()).collect();
    assert_eq!(tags, vec!["ring#1", "ring#0"]);
    assert!(!program.paths[0].is_outer());
    assert!(program.paths[1].is_outer());

    let text = program.gcode.to_text();
    let hole = text.find("; contour ring#1 (inner)").expect("hole block");
    let outer = text.find("; contour ring#0 (outer)").expect("outer block");
    assert!(hole < outer);
}

#[test]
fn test_svg_hole_is_compensated_inward() {
    let contours = import_svg(data_path("ring.svg")).expect("import ring");
    let params = MachiningParameters {
        tool_radius: 1.0,
        lead_length: 0.0,
        ..MachiningParameters::default()
    };
    let program = compile(&contours, &[], &params).expect("compile");
    // hole spans x 40..80, y 30..50 after the flip
    for p in program.paths[0].body() {
        assert!(p.x > 40.5 && p.x < 79.5, "{p:?}");
        assert!(p.y > 30.5 && p.y < 49.5, "{p:?}");
    }
}

#[test]
fn test_prev_end_threads_between_contours() {
    let first = RawContour::from_polyline(
        "first",
        &[
            Point::new(-20.0, 0.0),
            Point::new(-10.0, 0.0),
            Point::new(-10.0, 10.0),
        ],
        false,
    );
    let second = RawContour::from_polyline(
        "second",
        &[
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(5.0, 5.0),
            Point::new(0.0, 5.0),
        ],
        true,
    );
    let params = MachiningParameters {
        tool_radius: 0.0,
        lead_length: 0.0,
        ..MachiningParameters::default()
    };
    let program = compile(&[second, first], &[], &params).expect("compile");
    assert_eq!(program.paths[0].tag(), "first");
    assert_eq!(program.paths[0].end_point(), Some(Point::new(-10.0, 10.0)));
    // (0,5) is the vertex nearest (-10,10)
    assert_eq!(program.paths[1].body()[0], Point::new(0.0, 5.0));
}

#[test]
fn test_circle_job_with_reversed_hole() {
    let mut job = Job::new("plate");
    job.add_shape(JobShape::new(
        "plate",
        ShapeGeometry::Rectangle {
            min: Point::new(0.0, 0.0),
            max: Point::new(100.0, 60.0),
        },
    ));
    let mut hole = ShapeGeometry::Circle {
        center: Point::new(50.0, 30.0),
        radius: 15.0,
    }
    .to_raw_contour("hole");
    hole.segments.reverse();
    for segment in &mut hole.segments {
        segment.points.reverse();
    }
    job.add_contour(hole);

    let program = job.compile().expect("compile");
    assert!(program.warnings.is_empty());
    assert_eq!(program.gcode.lines[0], "; plate");
    assert_eq!(program.paths.len(), 2);
    assert_eq!(program.paths[0].tag(), "hole");
    assert_eq!(program.paths[1].tag(), "plate");
}

#[test]
fn test_skipped_contour_does_not_stop_run() {
    let sliver = RawContour::from_polyline(
        "tiny",
        &[Point::new(0.0, 0.0), Point::new(0.0, 1.0), Point::new(1.0, 0.0)],
        true,
    );
    let plate = RawContour::from_polyline(
        "plate",
        &[
            Point::new(10.0, 0.0),
            Point::new(30.0, 0.0),
            Point::new(30.0, 20.0),
            Point::new(10.0, 20.0),
        ],
        true,
    );
    let params = MachiningParameters {
        tool_radius: 2.0,
        ..MachiningParameters::default()
    };
    let program = compile(&[sliver, plate], &[], &params).expect("compile");
    assert_eq!(program.paths.len(), 1);
    assert_eq!(count_warnings(&program.warnings, WarningKind::Collapsed), 1);
    assert!(program
        .gcode
        .lines
        .iter()
        .any(|l| l.starts_with("; skipped tiny:")));
}

fn narrow_notch_plate(half_width: f64) -> RawContour {
    RawContour::from_polyline(
        "notched",
        &[
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(5.0 + half_width, 10.0),
            Point::new(5.0, 1.0),
            Point::new(5.0 - half_width, 10.0),
            Point::new(0.0, 10.0),
        ],
        true,
    )
}

#[test]
fn test_notch_narrower_than_tool_is_cut_with_warning() {
    for half_width in [0.01, 0.1] {
        let params = MachiningParameters {
            tool_radius: 0.25,
            ..MachiningParameters::default()
        };
        let program = compile(&[narrow_notch_plate(half_width)], &[], &params).expect("compile");
        assert_eq!(program.paths.len(), 1, "half width {half_width}");
        assert_eq!(count_warnings(&program.warnings, WarningKind::Collapsed), 0);
        assert_eq!(
            count_warnings(&program.warnings, WarningKind::UnresolvedSelfIntersection),
            1
        );
        for p in program.paths[0].body() {
            assert!(p.y <= 10.25 + 1e-9, "{p:?} above the plate");
        }
        assert!(program
            .gcode
            .lines
            .iter()
            .any(|l| l == "; warning: offset still crosses itself; cut is best effort"));
    }
}

#[test]
fn test_depth_capped_curve_is_annotated_in_program() {
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
        tool_radius: 0.0,
        ..MachiningParameters::default()
    };
    let program = compile(&[arch], &[], &params).expect("compile");
    assert_eq!(program.paths.len(), 1);
    assert_eq!(
        count_warnings(&program.warnings, WarningKind::FlattenDepthLimit),
        1
    );
    assert!(program
        .gcode
        .lines
        .iter()
        .any(|l| l.starts_with("; warning: ") && l.contains("subdivision depth 16")));
}

#[test]
fn test_zero_merge_epsilon_compiles_plain_square() {
    let square = RawContour::from_polyline(
        "sq",
        &[
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ],
        true,
    );
    let params = MachiningParameters {
        merge_epsilon: 0.0,
        ..MachiningParameters::default()
    };
    let program = compile(&[square], &[], &params).expect("compile");
    assert_eq!(program.paths.len(), 1);
    assert!(program.warnings.is_empty());
    assert_eq!(program.paths[0].body().len(), 4);
}

#[test]
fn test_dxf_plate_cuts_slot_first() {
    let contours = import_dxf(data_path("plate.dxf")).expect("import plate");
    assert_eq!(contours.len(), 2);

    let program = compile(&contours, &[], &MachiningParameters::default()).expect("compile");
    assert!(program.warnings.is_empty());
    let tags: Vec<&str> = program.paths.iter().map(|p| p.tag()).collect();
    assert_eq!(tags, vec!["SLOT#1", "OUTLINE#0"]);
    assert!(!program.paths[0].is_outer());

    // the slot spans x 18..32 and y 18..22; compensation moves the cut inside
    for p in program.paths[0].body() {
        assert!(p.x > 18.0 && p.x < 32.0, "{p:?}");
        assert!(p.y > 18.0 && p.y < 22.0, "{p:?}");
    }
}
