//! Plan executor for running identity provider procedures.
//!
//! Procedures run strictly in plan order. The first failure stops the run:
//! every later procedure is recorded as skipped, and the next planning pass
//! starts again from a fresh observation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use tracing::{error, info, warn};

use crate::error::{IdpError, ProcedureError, Result};

use super::procedure::{Procedure, ProcedureKind};

/// Message recorded for procedures that never ran.
const SKIPPED_MESSAGE: &str = "Skipped after earlier procedure failure";

/// Executor for identity provider procedures.
#[derive(Debug, Default)]
pub struct PlanExecutor {
    /// Whether to only report what would run.
    dry_run: bool,
}

/// Result of executing a single procedure.
#[derive(Debug, Clone, Serialize)]
pub struct ProcedureResult {
    /// Position in the plan.
    pub index: usize,
    /// Procedure kind.
    pub kind: ProcedureKind,
    /// Stable procedure name.
    pub procedure: &'static str,
    /// Whether the procedure succeeded.
    pub success: bool,
    /// Whether the procedure was skipped.
    pub skipped: bool,
    /// Error message (if failed or skipped).
    pub error: Option<String>,
    /// When the procedure started.
    pub started_at: DateTime<Utc>,
    /// Run time in milliseconds.
    pub duration_ms: i64,
}

/// Result of executing a whole plan.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionResult {
    /// Individual procedure results.
    pub results: Vec<ProcedureResult>,
    /// Number of successful procedures.
    pub successful: usize,
    /// Number of failed procedures.
    pub failed: usize,
    /// Number of skipped procedures.
    pub skipped: usize,
    /// Whether the entire plan succeeded.
    pub success: bool,
}

impl PlanExecutor {
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new() -> Self {
        Self { dry_run: false }
    }

    /// Sets dry-run mode; procedures are reported but not executed.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Executes procedures in order, stopping at the first failure.
    pub async fn execute(&self, procedures: &[Procedure]) -> ExecutionResult {
        info!("Executing plan with {} procedures", procedures.len());

        let mut results = Vec::with_capacity(procedures.len());
        let mut halted = false;

        for (index, procedure) in procedures.iter().enumerate() {
            let started_at = Utc::now();

            if halted {
                warn!("Skipping procedure {index} ({})", procedure.name());
                results.push(ProcedureResult {
                    index,
                    kind: procedure.kind(),
                    procedure: procedure.name(),
                    success: false,
                    skipped: true,
                    error: Some(String::from(SKIPPED_MESSAGE)),
                    started_at,
                    duration_ms: 0,
                });
                continue;
            }

            let outcome = if self.dry_run {
                info!("[dry-run] Would execute {}", procedure.name());
                Ok(())
            } else {
                procedure.execute().await
            };

            let error = match outcome {
                Ok(()) => None,
                Err(err) => {
                    error!("Procedure {} failed: {err}", procedure.name());
                    halted = true;
                    Some(err.to_string())
                }
            };

            results.push(ProcedureResult {
                index,
                kind: procedure.kind(),
                procedure: procedure.name(),
                success: error.is_none(),
                skipped: false,
                error,
                started_at,
                duration_ms: (Utc::now() - started_at).num_milliseconds(),
            });
        }

        let successful = results.iter().filter(|r| r.success).count();
        let skipped = results.iter().filter(|r| r.skipped).count();
        let failed = results.len() - successful - skipped;

        ExecutionResult {
            success: failed == 0,
            results,
            successful,
            failed,
            skipped,
        }
    }
}

impl ExecutionResult {
    /// Returns the first failed procedure result, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<&ProcedureResult> {
        self.results.iter().find(|r| !r.success && !r.skipped)
    }

    /// Converts a failed run into an error naming the failed procedure.
    ///
    /// # Errors
    ///
    /// Returns `ProcedureError::Failed` if any procedure failed.
    pub fn into_result(self) -> Result<Self> {
        if let Some(failure) = self.first_failure() {
            return Err(IdpError::Procedure(ProcedureError::Failed {
                procedure: failure.procedure.to_string(),
                reason: failure.error.clone().unwrap_or_default(),
            }));
        }

        Ok(self)
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} succeeded, {} failed, {} skipped",
            self.successful, self.failed, self.skipped
        )?;
        for result in &self.results {
            let status = if result.success {
                "ok"
            } else if result.skipped {
                "skipped"
            } else {
                "failed"
            };
            write!(f, "  {}. {} [{status}]", result.index + 1, result.procedure)?;
            if let Some(error) = result.error.as_ref().filter(|_| !result.skipped) {
                write!(f, ": {error}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
