//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying sync results,
//! resource status and state to the user in text or JSON form. Sensitive
//! attributes are redacted in text output.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::ValidationResult;
use crate::runner::{ResourceStatus, SyncReport};
use crate::state::SyncState;
use crate::sync::{Reconciled, ResourceKind};

use super::commands::OutputFormat;

/// Placeholder shown instead of sensitive attribute values.
const REDACTED: &str = "(sensitive)";

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Resource status row for table display.
#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Remote")]
    remote: String,
}

/// State entry row for table display.
#[derive(Tabled)]
struct StateRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a sync report.
    #[must_use]
    pub fn format_report(&self, report: &SyncReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => Self::format_report_text(report),
        }
    }

    fn format_report_text(report: &SyncReport) -> String {
        let mut output = String::new();

        if report.changed() == 0 && report.success() {
            let _ = writeln!(
                output,
                "{} No changes required - resources are in sync.",
                "✓".green()
            );
            return output;
        }

        let _ = writeln!(
            output,
            "\nSync: {} created, {} updated, {} unchanged, {} removed",
            report.created.to_string().green(),
            report.updated.to_string().yellow(),
            report.unchanged,
            report.removed.to_string().red()
        );

        if !report.errors.is_empty() {
            let _ = writeln!(output, "\n{} Errors:", "✗".red());
            for error in &report.errors {
                let _ = writeln!(output, "   - {error}");
            }
        }

        output
    }

    /// Formats resource status rows.
    #[must_use]
    pub fn format_status(&self, statuses: &[ResourceStatus]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(statuses).unwrap_or_default(),
            OutputFormat::Text => Self::format_status_text(statuses),
        }
    }

    fn format_status_text(statuses: &[ResourceStatus]) -> String {
        if statuses.is_empty() {
            return String::from("No resources tracked. Run 'valosync apply' first.\n");
        }

        let rows: Vec<StatusRow> = statuses
            .iter()
            .map(|status| StatusRow {
                label: status.label.clone(),
                kind: status.kind.to_string(),
                id: status.remote_id.clone(),
                phase: status.phase.to_string(),
                remote: if status.present {
                    "present".green().to_string()
                } else {
                    "missing".red().to_string()
                },
            })
            .collect();

        let mut output = Table::new(rows).to_string();
        output.push('\n');
        output
    }

    /// Formats a lookup result.
    #[must_use]
    pub fn format_lookup(&self, kind: ResourceKind, reconciled: &Reconciled) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(reconciled).unwrap_or_default(),
            OutputFormat::Text => Self::format_lookup_text(kind, reconciled),
        }
    }

    fn format_lookup_text(kind: ResourceKind, reconciled: &Reconciled) -> String {
        let descriptor = kind.descriptor();
        let mut output = String::new();

        let _ = writeln!(output, "\n{kind} {}", reconciled.id.bold());
        for (name, value) in &reconciled.attributes {
            let sensitive = descriptor
                .attribute(name)
                .is_some_and(|spec| spec.sensitive);
            let rendered = if sensitive {
                REDACTED.to_string()
            } else {
                value.to_string()
            };
            let _ = writeln!(output, "  {name}: {rendered}");
        }

        output
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => {
                let warnings: Vec<&str> =
                    result.warnings.iter().map(String::as_str).collect();
                serde_json::json!({
                    "valid": result.is_valid(),
                    "warnings": warnings,
                })
                .to_string()
            }
            OutputFormat::Text => {
                let mut output = String::new();
                let _ = writeln!(output, "{} Manifest is valid.", "✓".green());
                if show_warnings && !result.warnings.is_empty() {
                    let _ = writeln!(output, "\nWarnings:");
                    for warning in &result.warnings {
                        let _ = writeln!(output, "  - {warning}");
                    }
                }
                output
            }
        }
    }

    /// Formats the recorded state.
    #[must_use]
    pub fn format_state(&self, state: &SyncState) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(state).unwrap_or_default(),
            OutputFormat::Text => Self::format_state_text(state),
        }
    }

    fn format_state_text(state: &SyncState) -> String {
        if state.is_empty() {
            return String::from("State is empty.\n");
        }

        let rows: Vec<StateRow> = state
            .resources
            .iter()
            .map(|(key, entry)| StateRow {
                key: key.clone(),
                id: entry.remote_id.clone(),
                phase: entry.phase.to_string(),
                updated: entry.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            })
            .collect();

        let mut output = Table::new(rows).to_string();
        output.push('\n');
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::AttrValue;
    use std::collections::BTreeMap;

    #[test]
    fn test_lookup_text_redacts_sensitive_attributes() {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            String::from("image_pattern"),
            AttrValue::Str(String::from("ghcr.io/acme/*")),
        );
        attributes.insert(String::from("type"), AttrValue::Str(String::from("docker")));
        attributes.insert(
            String::from("configuration"),
            AttrValue::Map(BTreeMap::from([(
                String::from("password"),
                String::from("hunter2"),
            )])),
        );

        let reconciled = Reconciled {
            id: String::from("rc-1"),
            attributes,
        };

        let formatter = OutputFormatter::new(OutputFormat::Text);
        let rendered = formatter.format_lookup(ResourceKind::RegistryCredentials, &reconciled);
        assert!(rendered.contains(REDACTED));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("ghcr.io/acme/*"));
    }

    #[test]
    fn test_report_text_mentions_errors() {
        let report = SyncReport {
            created: 1,
            errors: vec![String::from("store artifacts: API error 400: bad bucket")],
            ..SyncReport::default()
        };

        let formatter = OutputFormatter::new(OutputFormat::Text);
        let rendered = formatter.format_report(&report);
        assert!(rendered.contains("bad bucket"));
    }

    #[test]
    fn test_status_json_is_serializable() {
        let statuses = vec![ResourceStatus {
            label: String::from("demo"),
            kind: ResourceKind::Project,
            remote_id: String::from("p-1"),
            phase: crate::state::ResourcePhase::Present,
            present: true,
        }];

        let formatter = OutputFormatter::new(OutputFormat::Json);
        let rendered = formatter.format_status(&statuses);
        assert!(rendered.contains("\"p-1\""));
    }
}
