//! Policy engine configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for invoking the external policy engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine executable.
    #[serde(default = "default_command")]
    pub command: String,
    /// Arguments placed before the policy file path.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Root under which per-policy working directories are created.
    #[serde(default = "default_workdir_root")]
    pub workdir_root: PathBuf,
    /// Optional hard cap on a single engine invocation, in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

fn default_command() -> String {
    "custodian".to_string()
}

fn default_args() -> Vec<String> {
    vec!["run".to_string(), "-s".to_string(), ".".to_string()]
}

fn default_workdir_root() -> PathBuf {
    std::env::temp_dir()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            workdir_root: default_workdir_root(),
            timeout_seconds: None,
        }
    }
}
