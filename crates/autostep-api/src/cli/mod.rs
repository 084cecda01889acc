//! CLI command definitions and dispatch for the `autostep` binary.
//!
//! Uses clap derive macros for argument parsing. Commands that touch run
//! state (`run`, `resume-pending`, `serve`) hold the store lock for their
//! whole lifetime.

pub mod list;
pub mod resume;
pub mod run;
pub mod safeboot;
pub mod serve;
pub mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Run declarative maintenance workflows that survive reboots.
#[derive(Parser, Debug)]
#[command(name = "autostep", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data root (manifest, workflows, artifacts, state, logs).
    #[arg(long, global = true, env = "AUTOSTEP_ROOT")]
    pub root: Option<PathBuf>,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run a workflow from the manifest once.
    Run {
        /// Workflow name as listed in manifest.json.
        workflow: String,
    },

    /// List workflows in the manifest.
    #[command(alias = "ls")]
    List,

    /// Show stored run state.
    Status,

    /// Resume runs parked for a reboot, oldest first.
    #[command(name = "resume-pending")]
    ResumePending,

    /// Resume pending runs, then stay up until Ctrl+C or SIGTERM.
    Serve,

    /// Allow the Autostep service to start in Safe Mode (Windows).
    #[command(name = "configure-safeboot-service")]
    ConfigureSafebootService,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },

    /// Show version information.
    Version,
}

impl Commands {
    /// Whether the command needs exclusive access to the run store.
    pub fn needs_store_lock(&self) -> bool {
        matches!(self, Self::Run { .. } | Self::ResumePending | Self::Serve)
    }
}

/// Print version information.
pub fn print_version(json: bool) -> anyhow::Result<()> {
    if json {
        let info = serde_json::json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        });
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("autostep {}", env!("CARGO_PKG_VERSION"));
    }
    Ok(())
}
