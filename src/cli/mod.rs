//! CLI module for the plansync tool.
//!
//! This module provides the command-line interface for checking,
//! converting and transferring plan files.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat, Stage};
pub use output::{OutputFormatter, PlanSummary, SectionSummary};
