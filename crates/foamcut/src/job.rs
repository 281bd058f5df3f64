use crate::error::ToolpathResult;
use crate::geometry::{RawContour, ShapeGeometry};
use crate::toolpath_generation::{compile_titled, CompiledProgram};
use crate::types::{MachiningParameters, ShapeMetadata};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};
use ulid::Ulid;

/// Increment when the on-disk layout changes.
pub const JOB_FILE_VERSION: u32 = 1;

/// A cutting job: parameters plus the shapes to cut.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub meta: JobMeta,
    #[serde(default)]
    pub params: MachiningParameters,
    #[serde(default)]
    pub shapes: Vec<JobShape>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMeta {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_at_epoch_ms: u64,
    #[serde(default)]
    pub updated_at_epoch_ms: u64,
    #[serde(default = "default_file_version")]
    pub file_version: u32,
}

fn default_file_version() -> u32 {
    JOB_FILE_VERSION
}

/// One shape of a job together with its editing-surface overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobShape {
    #[serde(default = "Ulid::new")]
    pub id: Ulid,
    pub label: String,
    pub geometry: ShapeGeometry,
    #[serde(default)]
    pub metadata: ShapeMetadata,
}

impl JobShape {
    pub fn new(label: impl Into<String>, geometry: ShapeGeometry) -> Self {
        Self {
            id: Ulid::new(),
            label: label.into(),
            geometry,
            metadata: ShapeMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ShapeMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl Job {
    /// Create an empty job with default parameters.
    pub fn new(name: impl Into<String>) -> Self {
        let now = current_epoch_ms();
        Self {
            meta: JobMeta {
                name: name.into(),
                description: None,
                created_at_epoch_ms: now,
                updated_at_epoch_ms: now,
                file_version: JOB_FILE_VERSION,
            },
            params: MachiningParameters::default(),
            shapes: Vec::new(),
        }
    }

    /// Persist the job to disk as prettified JSON.
    pub fn save_to_path<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.touch_updated_timestamp();
        let data = serde_json::to_vec_pretty(self).context("serialize job")?;
        fs::write(&path, data)
            .with_context(|| format!("write job file {}", path.as_ref().display()))
    }

    /// Load a job from disk.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(&path)
            .with_context(|| format!("read job file from {}", path.as_ref().to_string_lossy()))?;
        let job: Job = serde_json::from_slice(&bytes).context("deserialize job file")?;
        if job.meta.file_version > JOB_FILE_VERSION {
            return Err(anyhow!(
                "job file version {} is newer than supported version {}",
                job.meta.file_version,
                JOB_FILE_VERSION
            ));
        }
        Ok(job)
    }

    pub fn touch_updated_timestamp(&mut self) {
        self.meta.updated_at_epoch_ms = current_epoch_ms();
    }

    /// Append a shape, returning its id.
    pub fn add_shape(&mut self, shape: JobShape) -> Ulid {
        let id = shape.id;
        self.shapes.push(shape);
        id
    }

    /// Append an imported contour as a raw path shape.
    pub fn add_contour(&mut self, contour: RawContour) -> Ulid {
        let geometry = ShapeGeometry::Path {
            segments: contour.segments,
            closed: contour.closed,
        };
        self.add_shape(JobShape::new(contour.tag, geometry))
    }

    pub fn find_shape(&self, id: Ulid) -> Option<&JobShape> {
        self.shapes.iter().find(|shape| shape.id == id)
    }

    /// Replace the overrides of the shape at `index`.
    pub fn set_metadata(&mut self, index: usize, metadata: ShapeMetadata) -> Result<()> {
        let slot = self
            .shapes
            .get_mut(index)
            .ok_or_else(|| anyhow!("invalid shape index {index}"))?;
        slot.metadata = metadata;
        Ok(())
    }

    /// Remove the shape at `index`, returning it.
    pub fn remove_shape(&mut self, index: usize) -> Result<JobShape> {
        if index >= self.shapes.len() {
            return Err(anyhow!("invalid shape index {index}"));
        }
        Ok(self.shapes.remove(index))
    }

    /// The shapes as pipeline input, in job order.
    pub fn raw_contours(&self) -> Vec<RawContour> {
        self.shapes
            .iter()
            .map(|shape| shape.geometry.to_raw_contour(shape.label.clone()))
            .collect()
    }

    /// Overrides index-aligned with [`raw_contours`](Self::raw_contours).
    pub fn shape_metadata(&self) -> Vec<ShapeMetadata> {
        self.shapes.iter().map(|shape| shape.metadata).collect()
    }

    /// Compile the job with its own parameters, titled with the job name.
    pub fn compile(&self) -> ToolpathResult<CompiledProgram> {
        compile_titled(
            &self.raw_contours(),
            &self.shape_metadata(),
            &self.params,
            &self.meta.name,
        )
    }
}

fn current_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|dur| dur.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn test_new_job_defaults() {
        let job = Job::new("Test");
        assert_eq!(job.meta.name, "Test");
        assert_eq!(job.meta.file_version, JOB_FILE_VERSION);
        assert_eq!(job.params, MachiningParameters::default());
        assert!(job.shapes.is_empty());
    }

    #[test]
    fn test_shape_management() {
        let mut job = Job::new("Shapes");
        let id = job.add_shape(JobShape::new(
            "line",
            ShapeGeometry::Line {
                from: Point::new(0.0, 0.0),
                to: Point::new(10.0, 0.0),
            },
        ));
        assert_eq!(job.find_shape(id).map(|s| s.label.as_str()), Some("line"));

        job.set_metadata(0, ShapeMetadata::with_start(1)).expect("set");
        assert_eq!(job.shape_metadata()[0].start_index, Some(1));
        assert!(job.set_metadata(3, ShapeMetadata::default()).is_err());

        job.remove_shape(0).expect("remove");
        assert!(job.remove_shape(0).is_err());
    }

    #[test]
    fn test_minimal_job_json() {
        let json = r#"{
            "meta": {"name": "minimal"},
            "shapes": [
                {"label": "r", "geometry": {"type": "rectangle", "min": {"x": 0, "y": 0}, "max": {"x": 5, "y": 5}}}
            ]
        }"#;
        let job: Job = serde_json::from_str(json).expect("parse");
        assert_eq!(job.meta.file_version, JOB_FILE_VERSION);
        assert_eq!(job.raw_contours().len(), 1);
        assert_eq!(job.shape_metadata(), vec![ShapeMetadata::default()]);
    }
}
