use anyhow::{anyhow, Context, Result};
use foamcut::*;
use kurbo::Point;
use std::io::Write;
use std::process::ExitCode;
use tracing::{error, warn};

fn main() -> ExitCode {
    if let Err(err) = init_logging() {
        eprintln!("failed to initialize logging: {err}");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(|s| s.as_str()) {
        Some("compile") => compile_job(&args[1..]),
        Some("svg") => compile_drawing(&args[1..], Drawing::Svg),
        Some("dxf") => compile_drawing(&args[1..], Drawing::Dxf),
        Some("demo") => demo(),
        _ => {
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn print_usage() {
    println!("Usage: foamcut <command>");
    println!("  compile <job.json> [out.gcode]                 - Compile a job file");
    println!("  svg <file.svg> [out.gcode] [--preset NAME]     - Cut every path of an SVG");
    println!("  dxf <file.dxf> [out.gcode] [--preset NAME]     - Cut lines, arcs and polylines of a DXF");
    println!("  demo                                           - Square plate with a round hole");
}

fn compile_job(args: &[String]) -> Result<()> {
    let job_path = args
        .first()
        .ok_or_else(|| anyhow!("compile needs a job file"))?;
    let job = Job::load_from_path(job_path)?;
    let program = job
        .compile()
        .with_context(|| format!("compile job {}", job_path))?;
    write_program(&program, args.get(1).map(String::as_str))
}

#[derive(Clone, Copy)]
enum Drawing {
    Svg,
    Dxf,
}

fn compile_drawing(args: &[String], kind: Drawing) -> Result<()> {
    let mut positional = Vec::new();
    let mut preset = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--preset" {
            preset = Some(
                iter.next()
                    .ok_or_else(|| anyhow!("--preset needs a name"))?
                    .clone(),
            );
        } else {
            positional.push(arg.as_str());
        }
    }

    let drawing_path = positional
        .first()
        .ok_or_else(|| anyhow!("an input drawing is required"))?;
    let params = match preset {
        Some(name) => {
            let library = ParameterLibrary::load_from_path(ParameterLibrary::default_library_path()?)?;
            library
                .find(&name)
                .cloned()
                .ok_or_else(|| anyhow!("unknown preset '{name}'"))?
        }
        None => MachiningParameters::default(),
    };

    let contours = match kind {
        Drawing::Svg => import_svg(drawing_path)?,
        Drawing::Dxf => import_dxf(drawing_path)?,
    };
    let program = compile_titled(&contours, &[], &params, drawing_path)
        .with_context(|| format!("compile {}", drawing_path))?;
    write_program(&program, positional.get(1).copied())
}

fn demo() -> Result<()> {
    let mut job = Job::new("demo plate");
    job.add_shape(JobShape::new(
        "plate",
        ShapeGeometry::Rectangle {
            min: Point::new(0.0, 0.0),
            max: Point::new(100.0, 60.0),
        },
    ));
    // circles are counter-clockwise; a hole must run the other way
    let hole = ShapeGeometry::Circle {
        center: Point::new(50.0, 30.0),
        radius: 15.0,
    }
    .to_raw_contour("hole");
    job.add_contour(reverse_contour(hole));

    let program = job.compile()?;
    write_program(&program, None)
}

fn reverse_contour(mut contour: RawContour) -> RawContour {
    contour.segments.reverse();
    for segment in &mut contour.segments {
        segment.points.reverse();
    }
    contour
}

fn write_program(program: &CompiledProgram, out: Option<&str>) -> Result<()> {
    for warning in &program.warnings {
        warn!("{warning}");
    }
    match out {
        Some(path) => program.gcode.save_to_path(path),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(program.gcode.to_text().as_bytes())
                .context("write G-code to stdout")
        }
    }
}
