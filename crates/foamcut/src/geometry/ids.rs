use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Identity of a flattened contour.
///
/// Offset contours carry the id of the contour they came from; the pipeline
/// maps it back to the input index to find per-shape metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContourId(Ulid);

impl ContourId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ContourId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContourId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
