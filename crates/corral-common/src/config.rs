//! Host-level configuration for the corral runtime.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CorralError, Result};

/// Settings that are fixed per host rather than per launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorralConfig {
    /// Mount point of the cgroup v1 hierarchies.
    pub cgroup_root: PathBuf,
    /// Directory grouping corral cgroups under each controller.
    pub cgroup_prefix: String,
    /// Name of the shared host bridge.
    pub bridge_name: String,
}

impl Default for CorralConfig {
    fn default() -> Self {
        Self {
            cgroup_root: PathBuf::from(crate::constants::CGROUP_V1_PATH),
            cgroup_prefix: crate::constants::DEFAULT_CGROUP_PREFIX.to_string(),
            bridge_name: crate::constants::DEFAULT_BRIDGE_NAME.to_string(),
        }
    }
}

impl CorralConfig {
    /// Loads a configuration from a JSON file; missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CorralError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        if config.bridge_name.is_empty() || config.bridge_name.len() > 15 {
            return Err(CorralError::invalid(format!(
                "bridge name {:?} must be 1-15 characters",
                config.bridge_name
            )));
        }
        Ok(config)
    }
}
