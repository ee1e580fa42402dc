//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::resource::ResourceKind;

/// Plansync - keep mission plans in step with a vehicle.
#[derive(Parser, Debug)]
#[command(name = "plansync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "PLANSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a template configuration file.
    Init {
        /// Directory to initialize (defaults to current directory).
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Force overwrite existing files.
        #[arg(short, long)]
        force: bool,
    },

    /// Check that a plan file is well formed.
    Validate {
        /// Plan, mission or waypoints file.
        file: PathBuf,
    },

    /// Show the sections of a plan file.
    Inspect {
        /// Plan, mission or waypoints file.
        file: PathBuf,
    },

    /// Convert a legacy mission or waypoints file into a plan file.
    Convert {
        /// File to read.
        input: PathBuf,

        /// Plan file to write; `.plan` is appended when there is no extension.
        output: PathBuf,
    },

    /// Send a plan to a simulated vehicle.
    Upload {
        /// Plan, mission or waypoints file.
        file: PathBuf,

        /// Make the vehicle reject this stage.
        #[arg(long)]
        fail_stage: Option<Stage>,
    },

    /// List the plan files in the plan directory.
    List,

    /// Read the plan back from a simulated vehicle.
    Download {
        /// Plan file to write; `.plan` is appended when there is no extension.
        output: PathBuf,

        /// Plan the simulated vehicle starts out with.
        #[arg(long)]
        seed: PathBuf,
    },
}

/// A cascade stage, as named on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Stage {
    /// Mission items.
    Route,
    /// Geofence.
    Boundary,
    /// Rally points.
    Rally,
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl From<Stage> for ResourceKind {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Route => Self::Route,
            Stage::Boundary => Self::Boundary,
            Stage::Rally => Self::RallyPoints,
        }
    }
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
