use crate::error::{ParameterError, ToolpathError};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Length unit of every coordinate and feed rate in a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Units {
    #[default]
    #[serde(rename = "mm")]
    Millimeters,
    #[serde(rename = "inch")]
    Inches,
}

/// Immutable configuration for one compilation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachiningParameters {
    /// Half the kerf width of the wire (or the cutter radius).
    pub tool_radius: f64,
    /// Depth below the work surface the tool plunges to. Emitted as `Z = -cut_depth`.
    pub cut_depth: f64,
    /// Height for rapid moves and retracts.
    pub safe_height: f64,
    pub cut_feed_rate: f64,
    pub plunge_feed_rate: f64,
    /// Maximum deviation of a flattened curve from its chords.
    pub curve_tolerance: f64,
    /// Length of the synthetic lead-in and lead-out moves. Zero disables them.
    pub lead_length: f64,
    pub units: Units,
    /// `S` word of the tool-enable directive (wire temperature). `None` emits a bare `M3`.
    pub tool_power: Option<f64>,
    /// Adjacent flattened points closer than this are merged.
    pub merge_epsilon: f64,
}

impl Default for MachiningParameters {
    fn default() -> Self {
        Self {
            tool_radius: 0.25,
            cut_depth: 0.0,
            safe_height: 10.0,
            cut_feed_rate: 150.0,
            plunge_feed_rate: 50.0,
            curve_tolerance: 0.1,
            lead_length: 2.0,
            units: Units::Millimeters,
            tool_power: Some(200.0),
            merge_epsilon: 1e-6,
        }
    }
}

impl MachiningParameters {
    /// Reject parameter sets that cannot produce a safe program.
    pub fn validate(&self) -> Result<(), ToolpathError> {
        let non_negative = [
            ("tool_radius", self.tool_radius),
            ("cut_depth", self.cut_depth),
            ("lead_length", self.lead_length),
            ("merge_epsilon", self.merge_epsilon),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ParameterError::OutOfRange {
                    name,
                    value,
                    min: 0.0,
                }
                .into());
            }
        }

        let positive = [
            ("cut_feed_rate", self.cut_feed_rate),
            ("plunge_feed_rate", self.plunge_feed_rate),
            ("curve_tolerance", self.curve_tolerance),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ParameterError::InvalidValue {
                    name,
                    reason: format!("must be positive, got {value}"),
                }
                .into());
            }
        }

        if !self.safe_height.is_finite() || self.safe_height <= -self.cut_depth {
            return Err(ParameterError::InvalidValue {
                name: "safe_height",
                reason: format!(
                    "{} is not above the cut plane Z{}",
                    self.safe_height, -self.cut_depth
                ),
            }
            .into());
        }

        if let Some(power) = self.tool_power {
            if !power.is_finite() || power < 0.0 {
                return Err(ParameterError::OutOfRange {
                    name: "tool_power",
                    value: power,
                    min: 0.0,
                }
                .into());
            }
        }

        Ok(())
    }

    /// Z coordinate of the cutting plane.
    pub fn cut_z(&self) -> f64 {
        -self.cut_depth
    }
}

/// Per-shape overrides coming from an editing surface.
///
/// Indices address the vertices of the contour being planned. Values that do
/// not fit are ignored in favour of the default policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeMetadata {
    pub start_index: Option<usize>,
    pub entry_index: Option<usize>,
    pub exit_index: Option<usize>,
    /// `Some(true)` forces clockwise traversal, `Some(false)` counter-clockwise.
    pub clockwise: Option<bool>,
}

impl ShapeMetadata {
    pub fn with_start(start_index: usize) -> Self {
        Self {
            start_index: Some(start_index),
            ..Self::default()
        }
    }

    pub fn checked_start(&self, len: usize) -> Result<Option<usize>, ToolpathError> {
        check_index("start_index", self.start_index, len)
    }

    pub fn checked_entry(&self, len: usize) -> Result<Option<usize>, ToolpathError> {
        check_index("entry_index", self.entry_index, len)
    }

    pub fn checked_exit(&self, len: usize) -> Result<Option<usize>, ToolpathError> {
        check_index("exit_index", self.exit_index, len)
    }
}

fn check_index(
    field: &'static str,
    index: Option<usize>,
    len: usize,
) -> Result<Option<usize>, ToolpathError> {
    match index {
        Some(index) if index >= len => Err(ToolpathError::OutOfRangeIndex { field, index, len }),
        other => Ok(other),
    }
}

/// A single machine motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Move {
    /// Non-cutting XY move at height `z`.
    Rapid { to: Point, z: f64 },
    /// Descent to the cutting plane.
    Plunge { z: f64, feed: f64 },
    /// Linear cutting move in the cutting plane.
    Cut { to: Point, feed: f64 },
    /// Rapid rise to `z`.
    Retract { z: f64 },
}

impl Move {
    /// Feed rate carried by the move; rapid-class moves carry none.
    pub fn feed(&self) -> Option<f64> {
        match self {
            Move::Plunge { feed, .. } | Move::Cut { feed, .. } => Some(*feed),
            Move::Rapid { .. } | Move::Retract { .. } => None,
        }
    }
}

/// Represents the final, machine-specific G-code output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GCode {
    /// A list of G-code command strings.
    pub lines: Vec<String>,
}

impl GCode {
    /// The program as newline-terminated text.
    pub fn to_text(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        use anyhow::Context;
        let path = path.as_ref();
        fs::write(path, self.to_text())
            .with_context(|| format!("write G-code {}", path.display()))
    }
}
