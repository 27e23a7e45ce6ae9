//! Identity provider plan construction.
//!
//! The plan compares the observed identity provider association of a
//! cluster with the desired one and emits the ordered procedures that
//! converge the two. Planning is synchronous and side-effect free; the
//! procedures do nothing until executed.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Span, debug, info_span};

use crate::config::{ConfigStatus, OidcIdentityProviderConfig, WaitConfig};
use crate::eks::IdentityProviderClient;
use crate::error::Result;

use super::procedure::{Procedure, ProcedureKind};

/// Timing for procedures that wait on the association lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSettings {
    /// Maximum time to wait.
    pub timeout: Duration,
    /// Delay between status polls.
    pub poll_interval: Duration,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self::from(WaitConfig::default())
    }
}

impl From<WaitConfig> for WaitSettings {
    fn from(config: WaitConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
        }
    }
}

/// Immutable inputs shared by a plan and every procedure it emits.
pub struct PlanContext {
    cluster_name: String,
    current: Option<OidcIdentityProviderConfig>,
    desired: Option<OidcIdentityProviderConfig>,
    client: Arc<dyn IdentityProviderClient>,
    wait: WaitSettings,
    span: Span,
}

impl PlanContext {
    /// Cluster the identity provider belongs to.
    #[must_use]
    pub fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    /// Observed identity provider, if any.
    #[must_use]
    pub const fn current(&self) -> Option<&OidcIdentityProviderConfig> {
        self.current.as_ref()
    }

    /// Desired identity provider, if any.
    #[must_use]
    pub const fn desired(&self) -> Option<&OidcIdentityProviderConfig> {
        self.desired.as_ref()
    }

    /// Client procedures execute against.
    #[must_use]
    pub fn client(&self) -> &dyn IdentityProviderClient {
        self.client.as_ref()
    }

    /// Wait timing.
    #[must_use]
    pub const fn wait(&self) -> WaitSettings {
        self.wait
    }

    /// Span procedures log under.
    #[must_use]
    pub const fn span(&self) -> &Span {
        &self.span
    }
}

impl fmt::Debug for PlanContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanContext")
            .field("cluster_name", &self.cluster_name)
            .field("current", &self.current)
            .field("desired", &self.desired)
            .field("wait", &self.wait)
            .finish_non_exhaustive()
    }
}

/// Plan that manages a cluster's OIDC identity provider association.
#[derive(Debug, Clone)]
pub struct IdentityProviderPlan {
    context: Arc<PlanContext>,
}

impl IdentityProviderPlan {
    /// Creates a plan from the observed and desired identity providers.
    #[must_use]
    pub fn new(
        cluster_name: &str,
        current: Option<OidcIdentityProviderConfig>,
        desired: Option<OidcIdentityProviderConfig>,
        client: Arc<dyn IdentityProviderClient>,
    ) -> Self {
        let provider = desired
            .as_ref()
            .or(current.as_ref())
            .map_or("-", |p| p.name.as_str());
        let span = info_span!("identity_provider", cluster = %cluster_name, provider = %provider);

        Self {
            context: Arc::new(PlanContext {
                cluster_name: cluster_name.to_string(),
                current,
                desired,
                client,
                wait: WaitSettings::default(),
                span,
            }),
        }
    }

    /// Sets the wait timing procedures use.
    #[must_use]
    pub fn with_wait(self, wait: WaitSettings) -> Self {
        let context = Arc::try_unwrap(self.context).unwrap_or_else(|shared| PlanContext {
            cluster_name: shared.cluster_name.clone(),
            current: shared.current.clone(),
            desired: shared.desired.clone(),
            client: Arc::clone(&shared.client),
            wait: shared.wait,
            span: shared.span.clone(),
        });

        Self {
            context: Arc::new(PlanContext { wait, ..context }),
        }
    }

    /// Returns the shared plan context.
    #[must_use]
    pub fn context(&self) -> Arc<PlanContext> {
        Arc::clone(&self.context)
    }

    /// Creates the ordered procedures that converge current toward desired.
    ///
    /// # Errors
    ///
    /// Reserved for procedure construction failures; the current decision
    /// table always yields a plan.
    pub fn create(&self) -> Result<Vec<Procedure>> {
        let _entered = self.context.span.enter();
        let mut procedures = Vec::new();

        let (current, desired) = match (self.context.current(), self.context.desired()) {
            (None, None) => {
                debug!("No identity provider observed or desired");
                return Ok(procedures);
            }
            (Some(current), None) => {
                // A disassociation already in flight completes on its own, and
                // a config still creating must reach Active before removal.
                if current.is_active() {
                    procedures.push(self.procedure(ProcedureKind::Disassociate));
                } else {
                    debug!(status = ?current.status, "Identity provider not active, removal deferred");
                }
                return Ok(procedures);
            }
            (None, Some(_)) => {
                procedures.push(self.procedure(ProcedureKind::Associate));
                return Ok(procedures);
            }
            (Some(current), Some(desired)) => (current, desired),
        };

        if current.is_equal(desired) {
            if !desired.tags.difference(&current.tags).is_empty() {
                procedures.push(self.procedure(ProcedureKind::UpdateTags));
            }

            if desired.tags.is_empty() && !current.tags.is_empty() {
                procedures.push(self.procedure(ProcedureKind::RemoveTags));
            }

            match &current.status {
                Some(ConfigStatus::Active) => {
                    debug!("Identity provider active, configuration unchanged");
                }
                Some(ConfigStatus::Creating) => {
                    procedures.push(self.procedure(ProcedureKind::WaitUntilAssociated));
                }
                _ => {}
            }
        } else {
            // Identity parameters cannot change in place; re-association
            // happens on a later pass once the old config is gone.
            debug!("Identity provider configuration changed, replacing");
            procedures.push(self.procedure(ProcedureKind::Disassociate));
        }

        Ok(procedures)
    }

    fn procedure(&self, kind: ProcedureKind) -> Procedure {
        Procedure::new(kind, self.context())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tags;
    use crate::eks::MockIdentityProviderClient;

    fn provider() -> OidcIdentityProviderConfig {
        let mut config =
            OidcIdentityProviderConfig::new("okta", "https://example.okta.com", "kubernetes");
        config.groups_claim = Some(String::from("groups"));
        config
    }

    fn observed(status: ConfigStatus) -> OidcIdentityProviderConfig {
        provider()
            .with_status(status)
            .with_arn("arn:aws:eks:eu-west-1:123456789012:identityproviderconfig/prod/oidc/okta/1")
    }

    fn plan_kinds(
        current: Option<OidcIdentityProviderConfig>,
        desired: Option<OidcIdentityProviderConfig>,
    ) -> Vec<ProcedureKind> {
        let plan = IdentityProviderPlan::new(
            "prod",
            current,
            desired,
            Arc::new(MockIdentityProviderClient::new()),
        );
        plan.create()
            .expect("planning never fails")
            .iter()
            .map(Procedure::kind)
            .collect()
    }

    #[test]
    fn test_nothing_observed_nothing_desired() {
        assert!(plan_kinds(None, None).is_empty());
    }

    #[test]
    fn test_unchanged_active_is_noop() {
        let tags = Tags::from([("team", "platform")]);
        let current = observed(ConfigStatus::Active).with_tags(tags.clone());
        let desired = provider().with_tags(tags);

        assert!(plan_kinds(Some(current), Some(desired)).is_empty());
    }

    #[test]
    fn test_create_when_absent() {
        assert_eq!(plan_kinds(None, Some(provider())), vec![ProcedureKind::Associate]);

        let tagged = provider().with_tags(Tags::from([("a", "1")]));
        assert_eq!(plan_kinds(None, Some(tagged)), vec![ProcedureKind::Associate]);
    }

    #[test]
    fn test_remove_active() {
        assert_eq!(
            plan_kinds(Some(observed(ConfigStatus::Active)), None),
            vec![ProcedureKind::Disassociate]
        );
    }

    #[test]
    fn test_remove_in_flight_is_deferred() {
        for status in [
            ConfigStatus::Creating,
            ConfigStatus::Deleting,
            ConfigStatus::Unknown(String::from("FAILED")),
        ] {
            assert!(plan_kinds(Some(observed(status)), None).is_empty());
        }

        assert!(plan_kinds(Some(provider()), None).is_empty());
    }

    #[test]
    fn test_tag_update() {
        let current = observed(ConfigStatus::Active).with_tags(Tags::from([("a", "1")]));
        let desired = provider().with_tags(Tags::from([("a", "1"), ("b", "2")]));

        assert_eq!(
            plan_kinds(Some(current), Some(desired)),
            vec![ProcedureKind::UpdateTags]
        );
    }

    #[test]
    fn test_tag_value_change() {
        let current = observed(ConfigStatus::Active).with_tags(Tags::from([("a", "1")]));
        let desired = provider().with_tags(Tags::from([("a", "2")]));

        assert_eq!(
            plan_kinds(Some(current), Some(desired)),
            vec![ProcedureKind::UpdateTags]
        );
    }

    #[test]
    fn test_extra_current_tags_are_kept() {
        let current = observed(ConfigStatus::Active).with_tags(Tags::from([("a", "1"), ("b", "2")]));
        let desired = provider().with_tags(Tags::from([("a", "1")]));

        assert!(plan_kinds(Some(current), Some(desired)).is_empty());
    }

    #[test]
    fn test_tag_removal() {
        let current = observed(ConfigStatus::Active).with_tags(Tags::from([("a", "1")]));

        assert_eq!(
            plan_kinds(Some(current), Some(provider())),
            vec![ProcedureKind::RemoveTags]
        );
    }

    #[test]
    fn test_wait_while_creating() {
        assert_eq!(
            plan_kinds(Some(observed(ConfigStatus::Creating)), Some(provider())),
            vec![ProcedureKind::WaitUntilAssociated]
        );
    }

    #[test]
    fn test_tags_before_wait() {
        let current = observed(ConfigStatus::Creating).with_tags(Tags::from([("a", "1")]));
        let desired = provider().with_tags(Tags::from([("b", "2")]));

        assert_eq!(
            plan_kinds(Some(current), Some(desired)),
            vec![ProcedureKind::UpdateTags, ProcedureKind::WaitUntilAssociated]
        );

        let current = observed(ConfigStatus::Creating).with_tags(Tags::from([("a", "1")]));
        assert_eq!(
            plan_kinds(Some(current), Some(provider())),
            vec![ProcedureKind::RemoveTags, ProcedureKind::WaitUntilAssociated]
        );
    }

    #[test]
    fn test_unchanged_other_status_only_tags() {
        let current = observed(ConfigStatus::Deleting).with_tags(Tags::from([("a", "1")]));
        let desired = provider().with_tags(Tags::from([("a", "2")]));

        assert_eq!(
            plan_kinds(Some(current), Some(desired)),
            vec![ProcedureKind::UpdateTags]
        );
        assert!(plan_kinds(Some(observed(ConfigStatus::Deleting)), Some(provider())).is_empty());
    }

    #[test]
    fn test_unchanged_without_status_only_tags() {
        let mut current = observed(ConfigStatus::Active).with_tags(Tags::from([("a", "1")]));
        current.status = None;
        let desired = provider().with_tags(Tags::from([("a", "2")]));

        assert_eq!(
            plan_kinds(Some(current.clone()), Some(desired)),
            vec![ProcedureKind::UpdateTags]
        );
        assert_eq!(
            plan_kinds(Some(current), Some(provider())),
            vec![ProcedureKind::RemoveTags]
        );

        let mut untagged = observed(ConfigStatus::Active);
        untagged.status = None;
        assert!(plan_kinds(Some(untagged), Some(provider())).is_empty());
    }

    #[test]
    fn test_replacement_on_core_change() {
        let mut desired = provider().with_tags(Tags::from([("a", "1")]));
        desired.client_id = String::from("other-client");

        for status in [
            Some(ConfigStatus::Active),
            Some(ConfigStatus::Creating),
            Some(ConfigStatus::Deleting),
            Some(ConfigStatus::Unknown(String::from("FAILED"))),
            None,
        ] {
            let mut current = observed(ConfigStatus::Active).with_tags(Tags::from([("b", "2")]));
            current.status = status;
            assert_eq!(
                plan_kinds(Some(current), Some(desired.clone())),
                vec![ProcedureKind::Disassociate]
            );
        }
    }

    #[test]
    fn test_associate_and_disassociate_never_together() {
        let statuses = [
            None,
            Some(ConfigStatus::Active),
            Some(ConfigStatus::Creating),
            Some(ConfigStatus::Deleting),
        ];
        let mut changed = provider();
        changed.issuer_url = String::from("https://other.okta.com");

        for status in statuses {
            let mut current = provider();
            current.status = status;
            for desired in [None, Some(provider()), Some(changed.clone())] {
                let kinds = plan_kinds(Some(current.clone()), desired);
                assert!(
                    !(kinds.contains(&ProcedureKind::Associate)
                        && kinds.contains(&ProcedureKind::Disassociate))
                );
            }
        }
    }

    #[test]
    fn test_planning_is_repeatable() {
        let current = observed(ConfigStatus::Creating).with_tags(Tags::from([("a", "1")]));
        let desired = provider().with_tags(Tags::from([("b", "2")]));
        let plan = IdentityProviderPlan::new(
            "prod",
            Some(current),
            Some(desired),
            Arc::new(MockIdentityProviderClient::new()),
        );

        let first: Vec<_> = plan.create().expect("plan").iter().map(Procedure::kind).collect();
        let second: Vec<_> = plan.create().expect("plan").iter().map(Procedure::kind).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_with_wait_keeps_inputs() {
        let wait = WaitSettings {
            timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(10),
        };
        let plan = IdentityProviderPlan::new(
            "prod",
            None,
            Some(provider()),
            Arc::new(MockIdentityProviderClient::new()),
        )
        .with_wait(wait);

        let context = plan.context();
        assert_eq!(context.wait(), wait);
        assert_eq!(context.cluster_name(), "prod");
        assert!(context.desired().is_some());
    }
}
