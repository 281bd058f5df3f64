//! Error types for the toolpath pipeline.
//!
//! Contour-level failures are recoverable: the pipeline turns them into
//! [`Warning`] records and keeps going. Only malformed machining parameters
//! abort a whole run.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors produced by the pipeline stages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolpathError {
    /// A segment or contour is malformed (wrong control-point count, too few points).
    #[error("Invalid geometry in '{tag}': {reason}")]
    InvalidGeometry { tag: String, reason: String },

    /// Tool-radius compensation degenerated the contour.
    #[error("Offset collapsed for '{tag}': {reason}")]
    Collapsed { tag: String, reason: String },

    /// Loop cleanup could not remove every self-crossing of the offset contour.
    #[error("Unresolved self-intersection in '{tag}'")]
    UnresolvedSelfIntersection { tag: String },

    /// A shape metadata index does not address a vertex of the contour.
    #[error("Index {index} for {field} out of range (contour has {len} points)")]
    OutOfRangeIndex {
        field: &'static str,
        index: usize,
        len: usize,
    },

    /// The machining parameters are unusable.
    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),
}

/// Errors related to machining parameter validation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// A parameter value is below its allowed minimum.
    #[error("Parameter '{name}' out of range: {value} (minimum {min})")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
    },

    /// A parameter value is invalid for another reason.
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// Result type alias for pipeline operations.
pub type ToolpathResult<T> = Result<T, ToolpathError>;

/// Category of a non-fatal problem recorded during compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    InvalidGeometry,
    Collapsed,
    UnresolvedSelfIntersection,
    /// A curve hit the subdivision depth cap and was emitted as a chord.
    FlattenDepthLimit,
}

/// A per-contour diagnostic returned alongside the compiled program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    /// Source tag of the contour the warning belongs to.
    pub source: String,
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    pub fn new(source: impl Into<String>, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            kind,
            message: message.into(),
        }
    }

    /// Build a warning from a contour-level error.
    ///
    /// Returns `None` for errors that never produce a warning
    /// (out-of-range metadata and run-fatal parameter errors).
    pub fn from_error(source: impl Into<String>, err: &ToolpathError) -> Option<Self> {
        let kind = match err {
            ToolpathError::InvalidGeometry { .. } => WarningKind::InvalidGeometry,
            ToolpathError::Collapsed { .. } => WarningKind::Collapsed,
            ToolpathError::UnresolvedSelfIntersection { .. } => {
                WarningKind::UnresolvedSelfIntersection
            }
            ToolpathError::OutOfRangeIndex { .. } | ToolpathError::Parameter(_) => return None,
        };
        Some(Self::new(source, kind, err.to_string()))
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source, self.message)
    }
}
