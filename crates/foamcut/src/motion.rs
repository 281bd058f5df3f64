//! Motion emission.
//!
//! Walks planned paths through a small machine state machine and produces the
//! instruction stream the postprocessor serializes. The tool is always at safe
//! height before any XY rapid, plunges exactly once per contour at the plunge
//! feed, and cuts at the cut feed.

use crate::error::Warning;
use crate::planner::PlannedPath;
use crate::types::{MachiningParameters, Move, Units};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Where the machine is in the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineState {
    Idle,
    Retracted,
    Plunged,
    Cutting,
}

impl MachineState {
    /// Whether the machine may go from `self` to `next` in one step.
    pub fn allows(self, next: MachineState) -> bool {
        use MachineState::*;
        matches!(
            (self, next),
            (Idle, Retracted)
                | (Retracted, Plunged)
                | (Retracted, Idle)
                | (Plunged, Cutting)
                | (Plunged, Retracted)
                | (Cutting, Cutting)
                | (Cutting, Retracted)
        )
    }

    /// State after executing `m`. Rapids travel at safe height and leave the
    /// state alone.
    pub fn after(self, m: &Move) -> MachineState {
        match m {
            Move::Retract { .. } => MachineState::Retracted,
            Move::Rapid { .. } => self,
            Move::Plunge { .. } => MachineState::Plunged,
            Move::Cut { .. } => MachineState::Cutting,
        }
    }

    pub fn at_cut_depth(self) -> bool {
        matches!(self, MachineState::Plunged | MachineState::Cutting)
    }
}

/// One element of the emitted program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    Comment(String),
    Units(Units),
    AbsolutePositioning,
    PlaneXY,
    /// Switch the tool (wire heat, spindle) on.
    ToolOn { power: Option<f64> },
    ToolOff,
    /// Set the modal feed rate.
    Feed(f64),
    Motion(Move),
    ProgramEnd,
}

/// The emitted program, before text serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveStream {
    pub instructions: Vec<Instruction>,
}

impl MoveStream {
    /// Only the motion instructions, in order.
    pub fn moves(&self) -> impl Iterator<Item = &Move> {
        self.instructions.iter().filter_map(|i| match i {
            Instruction::Motion(m) => Some(m),
            _ => None,
        })
    }
}

/// Emit a program for `paths` with a default title.
pub fn emit(paths: &[PlannedPath], params: &MachiningParameters) -> MoveStream {
    emit_annotated(paths, &[], "foamcut program", params)
}

/// Emit a program for `paths`.
///
/// `skipped` lists contours that did not make it into `paths`; each one is
/// noted as a comment right after the header.
pub fn emit_annotated(
    paths: &[PlannedPath],
    skipped: &[Warning],
    title: &str,
    params: &MachiningParameters,
) -> MoveStream {
    let mut emitter = Emitter::new(params);
    emitter.header(title);
    for warning in skipped {
        emitter.comment(format!("skipped {}", warning));
    }
    for path in paths {
        emitter.contour(path);
    }
    emitter.footer();
    debug!(
        contours = paths.len(),
        instructions = emitter.stream.instructions.len(),
        "emitted program"
    );
    emitter.stream
}

struct Emitter<'a> {
    params: &'a MachiningParameters,
    state: MachineState,
    stream: MoveStream,
}

impl<'a> Emitter<'a> {
    fn new(params: &'a MachiningParameters) -> Self {
        Self {
            params,
            state: MachineState::Idle,
            stream: MoveStream::default(),
        }
    }

    fn push(&mut self, instruction: Instruction) {
        self.stream.instructions.push(instruction);
    }

    fn motion(&mut self, m: Move) {
        self.push(Instruction::Motion(m));
    }

    fn comment(&mut self, text: impl Into<String>) {
        self.push(Instruction::Comment(text.into()));
    }

    fn enter(&mut self, next: MachineState) {
        if !self.state.allows(next) {
            warn!(from = ?self.state, to = ?next, "unexpected machine transition");
        }
        debug_assert!(self.state.allows(next), "{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Idle -> Retracted.
    fn header(&mut self, title: &str) {
        self.comment(title);
        self.push(Instruction::Units(self.params.units));
        self.push(Instruction::AbsolutePositioning);
        self.push(Instruction::PlaneXY);
        self.motion(Move::Retract {
            z: self.params.safe_height,
        });
        self.push(Instruction::ToolOn {
            power: self.params.tool_power,
        });
        self.push(Instruction::Feed(self.params.cut_feed_rate));
        self.enter(MachineState::Retracted);
    }

    fn ensure_retracted(&mut self) {
        if self.state != MachineState::Retracted {
            self.motion(Move::Retract {
                z: self.params.safe_height,
            });
            self.enter(MachineState::Retracted);
        }
    }

    /// Retracted -> Plunged, at the current XY.
    fn plunge(&mut self) {
        self.ensure_retracted();
        self.motion(Move::Plunge {
            z: self.params.cut_z(),
            feed: self.params.plunge_feed_rate,
        });
        self.enter(MachineState::Plunged);
    }

    /// Plunged | Cutting -> Cutting. A cut never starts from safe height.
    fn cut(&mut self, to: Point) {
        if !self.state.at_cut_depth() {
            self.plunge();
        }
        self.motion(Move::Cut {
            to,
            feed: self.params.cut_feed_rate,
        });
        self.enter(MachineState::Cutting);
    }

    fn contour(&mut self, path: &PlannedPath) {
        let points = path.points();
        let Some(&start) = points.first() else {
            return;
        };

        self.comment(format!(
            "contour {} ({})",
            path.tag(),
            if path.is_outer() { "outer" } else { "inner" }
        ));
        for note in path.annotations() {
            self.comment(format!("warning: {}", note));
        }
        if let Some(entry) = path.entry() {
            self.comment(format!("entry {}", marker(entry)));
        }
        if let Some(exit) = path.exit() {
            self.comment(format!("exit {}", marker(exit)));
        }

        self.ensure_retracted();
        self.motion(Move::Rapid {
            to: start,
            z: self.params.safe_height,
        });
        self.plunge();

        let body_start = path.body_start();
        let body_end = body_start + path.body().len();
        for (index, &to) in points.iter().enumerate().skip(1) {
            if path.is_closed() && index == body_end {
                // closing move back to the start vertex, before the lead-out
                self.cut(points[body_start]);
            }
            self.cut(to);
        }
        if path.is_closed() && points.len() == body_end {
            self.cut(points[body_start]);
        }
    }

    /// * -> Idle.
    fn footer(&mut self) {
        self.ensure_retracted();
        self.push(Instruction::ToolOff);
        self.motion(Move::Rapid {
            to: Point::ORIGIN,
            z: self.params.safe_height,
        });
        self.push(Instruction::ProgramEnd);
        self.enter(MachineState::Idle);
    }
}

fn marker(p: Point) -> String {
    format!("X{:.3} Y{:.3}", p.x, p.y)
}
