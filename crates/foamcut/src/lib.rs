mod error;
mod geometry;
mod job;
mod motion;
mod order;
mod planner;
mod postprocessor;
mod presets;
mod toolpath_generation;
mod types;

pub use error::*;
pub use geometry::*;
pub use job::*;
pub use motion::{emit, emit_annotated, Instruction, MachineState, MoveStream};
pub use order::order;
pub use planner::{plan, PlannedPath};
pub use postprocessor::post_process;
pub use presets::*;
pub use toolpath_generation::*;
pub use types::*;

/// Install the stderr log subscriber used by the CLI.
///
/// Honors `RUST_LOG`; defaults to `info`. G-code written to stdout stays clean.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
