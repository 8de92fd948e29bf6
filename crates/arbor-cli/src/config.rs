use std::path::Path;

use anyhow::{bail, Context};
use arbor_types::validate_node_id;
use serde::{Deserialize, Serialize};

/// Settings of the `arbor` binary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArborConfig {
    /// Layer labels, in creation order. One root node is built per layer.
    pub layers: Vec<String>,
    /// State ids of the demo state machine.
    pub states: Vec<String>,
    /// Index selected when the demo state machine is built.
    pub default_state: i64,
}

impl Default for ArborConfig {
    fn default() -> Self {
        Self {
            layers: vec!["model".into(), "view".into(), "controller".into()],
            states: vec!["idle".into(), "running".into(), "stopped".into()],
            default_state: 0,
        }
    }
}

impl ArborConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config = Self::from_toml_str(&source)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Every layer and state label must be usable as a node id, and at
    /// least one layer is required.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.layers.is_empty() {
            bail!("config must name at least one layer");
        }
        for id in self.layers.iter().chain(&self.states) {
            validate_node_id(id)?;
        }
        Ok(())
    }

    /// Load `path` when given, defaults otherwise.
    pub fn resolve(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
