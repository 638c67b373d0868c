// CLI argument definitions using Clap

use clap::Parser;
use std::path::PathBuf;

use crate::config::{BackendKind, Config};
use crate::execution::{BackendErrorPolicy, GroupStatusPolicy};

/// Replay recorded gtest lifecycle events into a launch report
#[derive(Parser, Debug)]
#[command(name = "rpgtest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Replay gtest lifecycle events into a hierarchical launch report", long_about = None)]
pub struct Cli {
    /// JSON-lines event file, `-` reads stdin
    #[arg(required_unless_present = "init_config")]
    pub events: Option<PathBuf>,

    /// Reporting backend (stream, console, memory)
    #[arg(short, long, value_name = "KIND")]
    pub backend: Option<BackendKind>,

    /// Output file for the stream backend
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// What to do when the backend fails a call
    #[arg(long, value_name = "POLICY", value_parser = ["abort", "degrade"])]
    pub on_backend_error: Option<String>,

    /// Close groups with the aggregate status of their children
    #[arg(long, default_value_t = false)]
    pub propagate_group_status: bool,

    /// Configuration file to use instead of the default locations
    #[arg(long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Create default configuration file
    #[arg(long, value_name = "CONFIG_FILE")]
    pub init_config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(short = 'v', long, default_value_t = false)]
    pub verbose: bool,
}

impl Cli {
    /// Override configuration values with the flags that were given
    pub fn apply(&self, config: &mut Config) {
        if let Some(kind) = self.backend {
            config.backend.kind = kind;
        }
        if let Some(output) = &self.output {
            config.backend.output = Some(output.clone());
        }
        match self.on_backend_error.as_deref() {
            Some("abort") => config.policy.on_backend_error = BackendErrorPolicy::Abort,
            Some("degrade") => config.policy.on_backend_error = BackendErrorPolicy::Degrade,
            _ => {}
        }
        if self.propagate_group_status {
            config.policy.group_status = GroupStatusPolicy::Propagate;
        }
    }
}
