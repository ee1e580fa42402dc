//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use std::fmt::Write;
use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::document::{DocumentFormat, PlanContents, PlanDocument};
use crate::error::DocumentError;
use crate::resource::{ResourceKind, SectionHasher};
use crate::sync::{SyncHistoryEntry, SyncOutcome};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// What a plan file holds, per section.
#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    /// File the plan was read from.
    pub path: String,
    /// Format the file was parsed as.
    pub format: String,
    /// Ground station named in the document.
    pub ground_station: String,
    /// Sections in cascade order.
    pub sections: Vec<SectionSummary>,
}

/// One row of a [`PlanSummary`].
#[derive(Debug, Clone, Serialize)]
pub struct SectionSummary {
    /// Sub-resource.
    pub kind: ResourceKind,
    /// Key in the plan document.
    pub key: &'static str,
    /// Number of entries.
    pub items: usize,
    /// SHA-256 of the section.
    pub fingerprint: String,
}

/// Section row for table display.
#[derive(Tabled)]
struct SectionRow {
    #[tabled(rename = "Section")]
    section: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Items")]
    items: usize,
    #[tabled(rename = "Fingerprint")]
    fingerprint: String,
}

impl PlanSummary {
    /// Summarizes a parsed plan.
    ///
    /// # Errors
    ///
    /// Returns an error if a section does not validate.
    pub fn new(
        path: &Path,
        format: DocumentFormat,
        document: &PlanDocument,
    ) -> Result<Self, DocumentError> {
        let contents = PlanContents::from_document(document)?;
        let hasher = SectionHasher::new();
        let fingerprints = [
            hasher.fingerprint(&contents.route),
            hasher.fingerprint(&contents.boundary),
            hasher.fingerprint(&contents.rally),
        ];

        let sections = contents
            .item_counts()
            .into_iter()
            .zip(fingerprints)
            .map(|((kind, items), fingerprint)| SectionSummary {
                kind,
                key: kind.document_key(),
                items,
                fingerprint,
            })
            .collect();

        Ok(Self {
            path: path.display().to_string(),
            format: format.to_string(),
            ground_station: document.ground_station.clone(),
            sections,
        })
    }

    /// Total number of entries across all sections.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.sections.iter().map(|s| s.items).sum()
    }
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the result of `validate`.
    #[must_use]
    pub fn format_validation(&self, summary: &PlanSummary) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "status": "valid",
                "plan": summary,
            })),
            OutputFormat::Text => {
                let counts = summary
                    .sections
                    .iter()
                    .map(|s| format!("{} {}", s.items, s.kind))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "{} {} is a valid {} file ({counts})\n",
                    "✓".green(),
                    summary.path,
                    summary.format
                )
            }
        }
    }

    /// Formats the per-section view of `inspect`.
    #[must_use]
    pub fn format_plan(&self, summary: &PlanSummary) -> String {
        match self.format {
            OutputFormat::Json => to_json(summary),
            OutputFormat::Text => Self::format_plan_text(summary),
        }
    }

    fn format_plan_text(summary: &PlanSummary) -> String {
        let mut output = String::new();

        let _ = write!(
            output,
            "\n{} ({})\n   Ground station: {}\n\n",
            summary.path.bold(),
            summary.format,
            summary.ground_station
        );

        let rows: Vec<SectionRow> = summary
            .sections
            .iter()
            .map(|s| SectionRow {
                section: s.kind.to_string(),
                key: s.key.to_string(),
                items: s.items,
                fingerprint: SectionHasher::short(&s.fingerprint).to_string(),
            })
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        if summary.total_items() == 0 {
            let _ = write!(output, "\n{} Plan is empty\n", "⚠".yellow());
        }

        output
    }

    /// Formats the outcome of an upload or download cascade.
    #[must_use]
    pub fn format_sync(&self, entry: &SyncHistoryEntry) -> String {
        match self.format {
            OutputFormat::Json => to_json(entry),
            OutputFormat::Text => {
                let elapsed = (entry.finished_at - entry.started_at).num_milliseconds();
                let status = match &entry.outcome {
                    SyncOutcome::Finished => format!("{} {} finished", "✓".green(), entry.direction),
                    SyncOutcome::Failed { kind, reason } => {
                        format!("{} {} failed at {kind}: {reason}", "✗".red(), entry.direction)
                    }
                    SyncOutcome::Abandoned => {
                        format!("{} {} abandoned", "⚠".yellow(), entry.direction)
                    }
                };

                let mut output = format!("{status}\n\n");
                let _ = writeln!(output, "   Cascade: {}", entry.cascade);
                let _ = writeln!(output, "   Device: {}", entry.device);
                let _ = writeln!(output, "   Duration: {elapsed} ms");
                output
            }
        }
    }

    /// Formats the files found in the plan directory.
    #[must_use]
    pub fn format_listing(&self, base_dir: &Path, files: &[PathBuf]) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "plan_dir": base_dir.display().to_string(),
                "files": files.iter().map(|f| f.display().to_string()).collect::<Vec<_>>(),
            })),
            OutputFormat::Text => {
                if files.is_empty() {
                    return format!("No plan files in {}\n", base_dir.display());
                }
                let mut output = format!("{}\n", base_dir.display().to_string().bold());
                for file in files {
                    let _ = writeln!(output, "   {}", file.display());
                }
                output
            }
        }
    }

    /// Formats a message saying a file was written.
    #[must_use]
    pub fn format_written(&self, path: &Path) -> String {
        self.success(&format!("Wrote {}", path.display()))
    }

    /// Formats a success message.
    #[must_use]
    pub fn success(&self, message: &str) -> String {
        self.message("success", &"✓".green(), message)
    }

    /// Formats an error message.
    #[must_use]
    pub fn error(&self, message: &str) -> String {
        self.message("error", &"✗".red(), message)
    }

    /// Formats a warning message.
    #[must_use]
    pub fn warning(&self, message: &str) -> String {
        self.message("warning", &"⚠".yellow(), message)
    }

    fn message(&self, status: &str, marker: &colored::ColoredString, message: &str) -> String {
        match self.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "status": status,
                "message": message,
            })),
            OutputFormat::Text => format!("{marker} {message}"),
        }
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
