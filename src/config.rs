// Configuration file handling

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::execution::listener::DEFAULT_RUN_DESCRIPTION;
use crate::execution::tracker::{DEFAULT_LAUNCH_NAME, DEFAULT_ROOT_NAME};
use crate::execution::{BackendErrorPolicy, GroupStatusPolicy, TrackerOptions};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub launch: LaunchConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub policy: PolicyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LaunchConfig {
    /// Launch (run) name
    #[serde(default = "default_launch_name")]
    pub name: String,

    /// Description used when the runner supplies none
    #[serde(default = "default_description")]
    pub description: String,

    /// Name of the root group every suite hangs under
    #[serde(default = "default_root_name")]
    pub root_name: String,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            name: default_launch_name(),
            description: default_description(),
            root_name: default_root_name(),
        }
    }
}

/// Backend kinds the replay binary can drive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// JSON lines, one per backend call
    #[default]
    Stream,
    /// Indented tree for humans
    Console,
    /// Keep calls in memory and report only the summary
    Memory,
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stream" => Ok(Self::Stream),
            "console" => Ok(Self::Console),
            "memory" => Ok(Self::Memory),
            other => Err(format!(
                "unknown backend {:?} (expected stream, console or memory)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,

    /// Output file for the stream backend, stdout when unset
    #[serde(default)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct PolicyConfig {
    #[serde(default)]
    pub on_backend_error: BackendErrorPolicy,

    #[serde(default)]
    pub group_status: GroupStatusPolicy,
}

pub const ENV_RPGTEST_CONFIG: &str = "RPGTEST_CONFIG";
pub const CONFIG_FILE_NAME: &str = ".rpgtestrc.toml";

fn default_launch_name() -> String {
    DEFAULT_LAUNCH_NAME.to_string()
}

fn default_description() -> String {
    DEFAULT_RUN_DESCRIPTION.to_string()
}

fn default_root_name() -> String {
    DEFAULT_ROOT_NAME.to_string()
}

impl Config {
    /// Load configuration from default locations
    pub fn load() -> Option<Self> {
        // Check locations in order:
        // 1. $RPGTEST_CONFIG
        // 2. .rpgtestrc.toml (current directory)
        // 3. ~/.rpgtestrc.toml (home directory)

        if let Some(path) = std::env::var_os(ENV_RPGTEST_CONFIG) {
            return Self::load_from_file(Path::new(&path));
        }

        let mut paths = Vec::new();
        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join(CONFIG_FILE_NAME));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(CONFIG_FILE_NAME));
        }

        paths
            .iter()
            .find(|path| path.exists())
            .and_then(|path| Self::load_from_file(path))
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read config {}: {}", path.display(), e);
                return None;
            }
        };
        match Self::parse(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Ignoring invalid config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Generate configuration as TOML
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_else(|_| String::new())
    }

    pub fn tracker_options(&self) -> TrackerOptions {
        TrackerOptions {
            launch_name: self.launch.name.clone(),
            root_name: self.launch.root_name.clone(),
            group_status: self.policy.group_status,
        }
    }
}
