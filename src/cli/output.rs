//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying plans,
//! reconciliation results and observed providers in text or JSON.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{ConfigHasher, ConfigStatus, OidcIdentityProviderConfig, ValidationResult};
use crate::planner::ProcedureKind;
use crate::reconciler::{PlanReport, ReconciliationResult};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Procedure row for table display.
#[derive(Tabled)]
struct ProcedureRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Procedure")]
    procedure: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Provider attribute row for table display.
#[derive(Tabled)]
struct AttributeRow {
    #[tabled(rename = "Attribute")]
    attribute: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a plan report for display.
    #[must_use]
    pub fn format_plan(&self, report: &PlanReport) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&PlanJson::from(report)).unwrap_or_default()
            }
            OutputFormat::Text => Self::format_plan_text(report),
        }
    }

    /// Formats a plan as text.
    fn format_plan_text(report: &PlanReport) -> String {
        let mut output = String::new();

        let _ = writeln!(output, "\nIdentity provider plan for cluster {}", report.cluster);
        let _ = writeln!(
            output,
            "   Observed: {}",
            report
                .current
                .as_ref()
                .map_or_else(|| String::from("none"), Self::describe_provider)
        );
        let _ = writeln!(
            output,
            "   Desired:  {}",
            report
                .desired
                .as_ref()
                .map_or_else(|| String::from("none"), |d| d.name.clone())
        );
        if let Some(fingerprint) = &report.desired_fingerprint {
            let _ = writeln!(
                output,
                "   Fingerprint: {}",
                ConfigHasher::new().short_hash(fingerprint)
            );
        }
        output.push('\n');

        if report.is_converged() {
            let _ = writeln!(
                output,
                "{} No changes required - identity provider is up to date.",
                "✓".green()
            );
            return output;
        }

        let rows: Vec<ProcedureRow> = report
            .procedures
            .iter()
            .enumerate()
            .map(|(i, p)| ProcedureRow {
                index: i + 1,
                procedure: Self::format_kind(p.kind()),
                reason: Self::reason(p.kind()).to_string(),
            })
            .collect();

        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let _ = write!(
            output,
            "\nPlan: {} procedure(s)\n",
            report.procedures.len().to_string().yellow()
        );

        output
    }

    /// Formats the observed provider for display.
    #[must_use]
    pub fn format_status(&self, cluster: &str, current: Option<&OidcIdentityProviderConfig>) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "cluster": cluster,
                "identity_provider": current,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!("\nCluster: {cluster}\n\n");

                let Some(provider) = current else {
                    output.push_str("   No OIDC identity provider associated.\n");
                    return output;
                };

                let tags = provider
                    .tags
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(", ");

                let rows = vec![
                    AttributeRow { attribute: "Name", value: provider.name.clone() },
                    AttributeRow {
                        attribute: "Status",
                        value: Self::format_status_value(provider.status.as_ref()),
                    },
                    AttributeRow { attribute: "Issuer", value: provider.issuer_url.clone() },
                    AttributeRow { attribute: "Client ID", value: provider.client_id.clone() },
                    AttributeRow {
                        attribute: "Username claim",
                        value: provider.username_claim.clone().unwrap_or_default(),
                    },
                    AttributeRow {
                        attribute: "Groups claim",
                        value: provider.groups_claim.clone().unwrap_or_default(),
                    },
                    AttributeRow { attribute: "Tags", value: tags },
                    AttributeRow {
                        attribute: "ARN",
                        value: provider.arn.clone().unwrap_or_default(),
                    },
                ];

                output.push_str(&Table::new(rows).to_string());
                output.push('\n');
                output
            }
        }
    }

    /// Formats a reconciliation result.
    #[must_use]
    pub fn format_reconciliation(&self, result: &ReconciliationResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Text => {
                let status = if result.success {
                    format!("{} Reconciliation successful", "✓".green())
                } else {
                    format!("{} Reconciliation failed", "✗".red())
                };

                let mut output = format!("{status}\n\n");
                if result.planned.is_empty() {
                    output.push_str("   No changes required.\n");
                    return output;
                }

                for outcome in &result.execution.results {
                    let marker = if outcome.success {
                        "✓".green()
                    } else if outcome.skipped {
                        "-".dimmed()
                    } else {
                        "✗".red()
                    };
                    let _ = write!(output, "   {marker} {}", outcome.procedure);
                    if !outcome.success
                        && !outcome.skipped
                        && let Some(error) = &outcome.error
                    {
                        let _ = write!(output, ": {error}");
                    }
                    output.push('\n');
                }

                output
            }
        }
    }

    /// Formats validation output.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&serde_json::json!({
                "valid": result.errors.is_empty(),
                "warnings": result.warnings,
            }))
            .unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = format!("{} Configuration is valid\n", "✓".green());
                if show_warnings {
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   {} {warning}", "⚠".yellow());
                    }
                }
                output
            }
        }
    }

    /// Formats a procedure kind with color.
    fn format_kind(kind: ProcedureKind) -> String {
        match kind {
            ProcedureKind::Associate => format!("+{kind}").green().to_string(),
            ProcedureKind::Disassociate => format!("-{kind}").red().to_string(),
            ProcedureKind::UpdateTags | ProcedureKind::RemoveTags => {
                format!("~{kind}").yellow().to_string()
            }
            ProcedureKind::WaitUntilAssociated => kind.to_string().dimmed().to_string(),
        }
    }

    /// Explains why a procedure kind is planned.
    const fn reason(kind: ProcedureKind) -> &'static str {
        match kind {
            ProcedureKind::Associate => "No identity provider associated",
            ProcedureKind::Disassociate => "Provider removed or configuration changed",
            ProcedureKind::UpdateTags => "Desired tags missing or different",
            ProcedureKind::RemoveTags => "Desired tags are empty",
            ProcedureKind::WaitUntilAssociated => "Association in progress",
        }
    }

    /// Formats a status with color.
    fn format_status_value(status: Option<&ConfigStatus>) -> String {
        match status {
            Some(ConfigStatus::Active) => "ACTIVE".green().to_string(),
            Some(ConfigStatus::Creating) => "CREATING".yellow().to_string(),
            Some(ConfigStatus::Deleting) => "DELETING".red().to_string(),
            Some(ConfigStatus::Unknown(other)) => other.dimmed().to_string(),
            None => "unknown".dimmed().to_string(),
        }
    }

    fn describe_provider(provider: &OidcIdentityProviderConfig) -> String {
        provider.status.as_ref().map_or_else(
            || provider.name.clone(),
            |status| format!("{} ({status})", provider.name),
        )
    }
}

// JSON serialization helpers

#[derive(serde::Serialize)]
struct PlanJson {
    cluster: String,
    converged: bool,
    current_status: Option<String>,
    desired_fingerprint: Option<String>,
    procedures: Vec<ProcedureJson>,
}

#[derive(serde::Serialize)]
struct ProcedureJson {
    index: usize,
    kind: ProcedureKind,
    name: &'static str,
}

impl From<&PlanReport> for PlanJson {
    fn from(report: &PlanReport) -> Self {
        Self {
            cluster: report.cluster.clone(),
            converged: report.is_converged(),
            current_status: report
                .current
                .as_ref()
                .and_then(|c| c.status.as_ref())
                .map(ToString::to_string),
            desired_fingerprint: report.desired_fingerprint.clone(),
            procedures: report
                .procedures
                .iter()
                .enumerate()
                .map(|(index, p)| ProcedureJson {
                    index,
                    kind: p.kind(),
                    name: p.name(),
                })
                .collect(),
        }
    }
}
