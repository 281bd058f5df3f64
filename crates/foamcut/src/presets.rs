use crate::types::MachiningParameters;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A named parameter set, e.g. one per foam density or wire gauge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedParameters {
    pub name: String,
    pub params: MachiningParameters,
}

/// Persisted collection of parameter presets.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ParameterLibrary {
    pub presets: Vec<NamedParameters>,
}

impl ParameterLibrary {
    pub fn new() -> Self {
        Self {
            presets: Vec::new(),
        }
    }

    /// Load a library from the provided path. Missing files yield an empty library.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::new());
        }

        let data =
            fs::read(path).with_context(|| format!("read preset library {}", path.display()))?;
        let library: ParameterLibrary =
            serde_json::from_slice(&data).context("deserialize preset library")?;
        Ok(library)
    }

    /// Persist the library, creating the parent directory if needed.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create preset directory {}", parent.display()))?;
        }

        let data = serde_json::to_vec_pretty(self).context("serialize preset library")?;
        fs::write(path, data).with_context(|| format!("write preset library {}", path.display()))
    }

    /// Add a preset. Names must be unique and parameters valid.
    pub fn add_preset(&mut self, name: impl Into<String>, params: MachiningParameters) -> Result<()> {
        let name = name.into();
        if self.find(&name).is_some() {
            return Err(anyhow!("preset '{name}' already exists"));
        }
        params
            .validate()
            .with_context(|| format!("preset '{name}'"))?;
        self.presets.push(NamedParameters { name, params });
        Ok(())
    }

    /// Replace the parameters of an existing preset.
    pub fn update_preset(&mut self, name: &str, params: MachiningParameters) -> Result<()> {
        params
            .validate()
            .with_context(|| format!("preset '{name}'"))?;
        let slot = self
            .presets
            .iter_mut()
            .find(|preset| preset.name == name)
            .ok_or_else(|| anyhow!("unknown preset '{name}'"))?;
        slot.params = params;
        Ok(())
    }

    pub fn remove_preset(&mut self, name: &str) -> Result<NamedParameters> {
        let index = self
            .presets
            .iter()
            .position(|preset| preset.name == name)
            .ok_or_else(|| anyhow!("unknown preset '{name}'"))?;
        Ok(self.presets.remove(index))
    }

    pub fn find(&self, name: &str) -> Option<&MachiningParameters> {
        self.presets
            .iter()
            .find(|preset| preset.name == name)
            .map(|preset| &preset.params)
    }

    /// Resolve the default library path (`~/.foamcut/presets.json`).
    pub fn default_library_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("could not determine home directory"))?;
        Ok(home.join(".foamcut").join("presets.json"))
    }
}
