//! Reconciler for a cluster's identity provider association.
//!
//! One reconciliation pass observes the current association, plans against
//! the desired configuration, and executes the plan. Passes never loop;
//! converging through transient states (e.g. re-associating after a
//! replacement) takes further passes started by the caller.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{ConfigHasher, OidcIdentityProviderConfig, PlannerConfig};
use crate::eks::IdentityProviderClient;
use crate::error::Result;
use crate::planner::{ExecutionResult, IdentityProviderPlan, PlanExecutor, Procedure, ProcedureKind};

/// Reconciler for one cluster's identity provider.
pub struct Reconciler<'a> {
    /// Desired configuration.
    config: &'a PlannerConfig,
    /// Client used to observe and execute.
    client: Arc<dyn IdentityProviderClient>,
    /// Configuration hasher.
    hasher: ConfigHasher,
    /// Whether procedures are only reported.
    dry_run: bool,
}

/// Plan computed for one pass, with the inputs it was derived from.
#[derive(Debug)]
pub struct PlanReport {
    /// Cluster name.
    pub cluster: String,
    /// Observed identity provider.
    pub current: Option<OidcIdentityProviderConfig>,
    /// Desired identity provider.
    pub desired: Option<OidcIdentityProviderConfig>,
    /// Fingerprint of the desired configuration.
    pub desired_fingerprint: Option<String>,
    /// Ordered procedures.
    pub procedures: Vec<Procedure>,
}

/// Result of a reconciliation pass.
#[derive(Debug, Serialize)]
pub struct ReconciliationResult {
    /// Cluster name.
    pub cluster: String,
    /// Whether every planned procedure succeeded.
    pub success: bool,
    /// Planned procedure kinds, in order.
    pub planned: Vec<ProcedureKind>,
    /// Execution details.
    pub execution: ExecutionResult,
}

impl<'a> Reconciler<'a> {
    /// Creates a new reconciler.
    #[must_use]
    pub fn new(config: &'a PlannerConfig, client: Arc<dyn IdentityProviderClient>) -> Self {
        Self {
            config,
            client,
            hasher: ConfigHasher::new(),
            dry_run: false,
        }
    }

    /// Sets dry-run mode; planned procedures are reported but not executed.
    #[must_use]
    pub const fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Observes the cluster's current identity provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster cannot be queried.
    pub async fn observe(&self) -> Result<Option<OidcIdentityProviderConfig>> {
        self.client.find_current(&self.config.cluster.name).await
    }

    /// Builds a plan against an already observed identity provider.
    ///
    /// # Errors
    ///
    /// Returns an error if plan construction fails.
    pub fn plan_with(&self, current: Option<OidcIdentityProviderConfig>) -> Result<PlanReport> {
        let desired = self.config.identity_provider.clone();
        let plan = IdentityProviderPlan::new(
            &self.config.cluster.name,
            current.clone(),
            desired.clone(),
            Arc::clone(&self.client),
        )
        .with_wait(self.config.wait.into());

        let procedures = plan.create()?;
        info!(
            "Planned {} procedures for cluster {}",
            procedures.len(),
            self.config.cluster.name
        );

        Ok(PlanReport {
            cluster: self.config.cluster.name.clone(),
            desired_fingerprint: desired.as_ref().map(|d| self.hasher.hash_provider(d)),
            current,
            desired,
            procedures,
        })
    }

    /// Observes and plans without executing.
    ///
    /// # Errors
    ///
    /// Returns an error if observation or planning fails.
    pub async fn plan_only(&self) -> Result<PlanReport> {
        let current = self.observe().await?;
        self.plan_with(current)
    }

    /// Performs one reconciliation pass.
    ///
    /// # Errors
    ///
    /// Returns an error if observation or planning fails. Procedure
    /// failures are reported in the result.
    pub async fn reconcile(&self) -> Result<ReconciliationResult> {
        info!(
            "Starting identity provider reconciliation for cluster {}",
            self.config.cluster.name
        );

        let report = self.plan_only().await?;
        Ok(self.execute(report).await)
    }

    /// Executes a previously computed plan.
    pub async fn execute(&self, report: PlanReport) -> ReconciliationResult {
        if report.procedures.is_empty() {
            info!("No changes required - identity provider is converged");
        }

        let execution = PlanExecutor::new()
            .with_dry_run(self.dry_run)
            .execute(&report.procedures)
            .await;

        if !execution.success {
            warn!(
                "Reconciliation stopped after {} failed procedure(s)",
                execution.failed
            );
        }

        ReconciliationResult {
            cluster: report.cluster,
            success: execution.success,
            planned: report.procedures.iter().map(Procedure::kind).collect(),
            execution,
        }
    }
}

impl PlanReport {
    /// Returns true if nothing needs to be done.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.procedures.is_empty()
    }
}

impl std::fmt::Display for ReconciliationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.success { "successful" } else { "failed" };
        writeln!(f, "Reconciliation of cluster {} {status}:", self.cluster)?;
        if self.planned.is_empty() {
            return writeln!(f, "  No changes required");
        }
        write!(f, "  {}", self.execution)
    }
}
