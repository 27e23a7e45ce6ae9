//! Procedures emitted by the identity provider plan.
//!
//! A procedure is an inert descriptor until [`Procedure::execute`] is called:
//! it holds its kind and a handle to the shared plan context, and dispatches
//! to the matching remote operation by pattern match.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{Instrument, debug, info};

use crate::config::OidcIdentityProviderConfig;
use crate::error::{IdpError, ProcedureError, Result};

use super::plan::PlanContext;

/// The kinds of remediation work a plan can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcedureKind {
    /// Associate the desired identity provider with the cluster.
    Associate,
    /// Disassociate the current identity provider from the cluster.
    Disassociate,
    /// Apply the desired tags to the current identity provider.
    UpdateTags,
    /// Remove every tag from the current identity provider.
    RemoveTags,
    /// Block until the current association becomes active.
    WaitUntilAssociated,
}

impl ProcedureKind {
    /// Returns the stable procedure name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Associate => "identity_provider_associate",
            Self::Disassociate => "identity_provider_disassociate",
            Self::UpdateTags => "update_identity_provider_tags",
            Self::RemoveTags => "remove_identity_provider_tags",
            Self::WaitUntilAssociated => "wait_identity_provider_association",
        }
    }
}

impl fmt::Display for ProcedureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A unit of remediation work bound to its plan context.
#[derive(Clone)]
pub struct Procedure {
    /// What this procedure does.
    kind: ProcedureKind,
    /// Shared plan inputs.
    context: Arc<PlanContext>,
}

impl Procedure {
    pub(super) const fn new(kind: ProcedureKind, context: Arc<PlanContext>) -> Self {
        Self { kind, context }
    }

    /// Returns the procedure kind.
    #[must_use]
    pub const fn kind(&self) -> ProcedureKind {
        self.kind
    }

    /// Returns the stable procedure name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Executes the procedure against the plan's client.
    ///
    /// # Errors
    ///
    /// Returns an error if a required input is missing from the plan, the
    /// remote call fails, or waiting for the association times out.
    pub async fn execute(&self) -> Result<()> {
        let span = self.context.span().clone();

        async {
            debug!(procedure = self.name(), "Executing procedure");

            match self.kind {
                ProcedureKind::Associate => self.associate().await,
                ProcedureKind::Disassociate => self.disassociate().await,
                ProcedureKind::UpdateTags => self.update_tags().await,
                ProcedureKind::RemoveTags => self.remove_tags().await,
                ProcedureKind::WaitUntilAssociated => self.wait_until_associated().await,
            }
        }
        .instrument(span)
        .await
    }

    async fn associate(&self) -> Result<()> {
        let desired = self.desired()?;
        self.context
            .client()
            .associate(self.context.cluster_name(), desired)
            .await?;

        info!(provider = %desired.name, "Identity provider association requested");
        Ok(())
    }

    async fn disassociate(&self) -> Result<()> {
        let current = self.current()?;
        self.context
            .client()
            .disassociate(self.context.cluster_name(), &current.name)
            .await?;

        info!(provider = %current.name, "Identity provider disassociation requested");
        Ok(())
    }

    async fn update_tags(&self) -> Result<()> {
        let arn = self.current_arn()?;
        let desired = self.desired()?;
        self.context.client().tag_resource(arn, &desired.tags).await?;

        info!(tags = desired.tags.len(), "Identity provider tags updated");
        Ok(())
    }

    async fn remove_tags(&self) -> Result<()> {
        let arn = self.current_arn()?;
        let keys: Vec<String> = self.current()?.tags.keys().cloned().collect();
        self.context.client().untag_resource(arn, &keys).await?;

        info!(tags = keys.len(), "Identity provider tags removed");
        Ok(())
    }

    async fn wait_until_associated(&self) -> Result<()> {
        let current = self.current()?;
        let cluster = self.context.cluster_name();
        let wait = self.context.wait();
        let start = tokio::time::Instant::now();

        loop {
            let observed = self.context.client().describe(cluster, &current.name).await?;

            let Some(observed) = observed else {
                return Err(IdpError::Procedure(ProcedureError::Failed {
                    procedure: self.name().to_string(),
                    reason: format!(
                        "identity provider '{}' disappeared from cluster '{cluster}'",
                        current.name
                    ),
                }));
            };

            if observed.is_active() {
                info!(provider = %current.name, "Identity provider association is active");
                return Ok(());
            }
            debug!(status = ?observed.status, "Identity provider not yet active");

            if start.elapsed() >= wait.timeout {
                return Err(IdpError::Procedure(ProcedureError::Timeout {
                    cluster: cluster.to_string(),
                    provider: current.name.clone(),
                }));
            }

            tokio::time::sleep(wait.poll_interval).await;
        }
    }

    fn desired(&self) -> Result<&OidcIdentityProviderConfig> {
        self.context
            .desired()
            .ok_or_else(|| ProcedureError::missing(self.name(), "desired identity provider").into())
    }

    fn current(&self) -> Result<&OidcIdentityProviderConfig> {
        self.context
            .current()
            .ok_or_else(|| ProcedureError::missing(self.name(), "current identity provider").into())
    }

    fn current_arn(&self) -> Result<&str> {
        self.current()?
            .arn
            .as_deref()
            .ok_or_else(|| ProcedureError::missing(self.name(), "current identity provider ARN").into())
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("kind", &self.kind)
            .field("cluster", &self.context.cluster_name())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (cluster {})", self.name(), self.context.cluster_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigStatus, Tags};
    use crate::eks::MockIdentityProviderClient;
    use crate::planner::plan::{IdentityProviderPlan, WaitSettings};
    use mockall::predicate::eq;
    use std::time::Duration;

    const ARN: &str = "arn:aws:eks:eu-west-1:123456789012:identityproviderconfig/prod/oidc/okta/1";

    fn provider() -> OidcIdentityProviderConfig {
        OidcIdentityProviderConfig::new("okta", "https://example.okta.com", "kubernetes")
    }

    fn fast_wait() -> WaitSettings {
        WaitSettings {
            timeout: Duration::from_millis(50),
            poll_interval: Duration::from_millis(5),
        }
    }

    fn procedure(
        kind: ProcedureKind,
        current: Option<OidcIdentityProviderConfig>,
        desired: Option<OidcIdentityProviderConfig>,
        client: MockIdentityProviderClient,
    ) -> Procedure {
        let plan = IdentityProviderPlan::new("prod", current, desired, Arc::new(client))
            .with_wait(fast_wait());
        Procedure::new(kind, plan.context())
    }

    #[test]
    fn test_procedure_names() {
        assert_eq!(ProcedureKind::Associate.name(), "identity_provider_associate");
        assert_eq!(ProcedureKind::Disassociate.name(), "identity_provider_disassociate");
        assert_eq!(ProcedureKind::UpdateTags.name(), "update_identity_provider_tags");
        assert_eq!(ProcedureKind::RemoveTags.name(), "remove_identity_provider_tags");
        assert_eq!(
            ProcedureKind::WaitUntilAssociated.to_string(),
            "wait_identity_provider_association"
        );
    }

    #[tokio::test]
    async fn test_associate_uses_desired_config() {
        let mut client = MockIdentityProviderClient::new();
        client
            .expect_associate()
            .withf(|cluster, config| cluster == "prod" && config.name == "okta")
            .times(1)
            .returning(|_, _| Ok(()));

        let proc = procedure(ProcedureKind::Associate, None, Some(provider()), client);
        tokio_test::assert_ok!(proc.execute().await);
    }

    #[tokio::test]
    async fn test_associate_without_desired_fails() {
        let client = MockIdentityProviderClient::new();
        let proc = procedure(ProcedureKind::Associate, None, None, client);

        let err = proc.execute().await.unwrap_err();
        assert!(matches!(
            err,
            IdpError::Procedure(ProcedureError::MissingInput { .. })
        ));
    }

    #[tokio::test]
    async fn test_disassociate_uses_current_name() {
        let mut client = MockIdentityProviderClient::new();
        client
            .expect_disassociate()
            .with(eq("prod"), eq("okta"))
            .times(1)
            .returning(|_, _| Ok(()));

        let current = provider().with_status(ConfigStatus::Active);
        let proc = procedure(ProcedureKind::Disassociate, Some(current), None, client);
        tokio_test::assert_ok!(proc.execute().await);
    }

    #[tokio::test]
    async fn test_update_tags_applies_all_desired_tags() {
        let mut client = MockIdentityProviderClient::new();
        client
            .expect_tag_resource()
            .withf(|arn, tags| arn == ARN && *tags == Tags::from([("a", "1"), ("b", "2")]))
            .times(1)
            .returning(|_, _| Ok(()));

        let current = provider()
            .with_arn(ARN)
            .with_tags(Tags::from([("a", "1")]));
        let desired = provider().with_tags(Tags::from([("a", "1"), ("b", "2")]));
        let proc = procedure(ProcedureKind::UpdateTags, Some(current), Some(desired), client);
        tokio_test::assert_ok!(proc.execute().await);
    }

    #[tokio::test]
    async fn test_update_tags_requires_arn() {
        let client = MockIdentityProviderClient::new();
        let proc = procedure(
            ProcedureKind::UpdateTags,
            Some(provider()),
            Some(provider()),
            client,
        );

        let err = proc.execute().await.unwrap_err();
        assert!(err.to_string().contains("ARN"));
    }

    #[tokio::test]
    async fn test_remove_tags_removes_every_current_key() {
        let mut client = MockIdentityProviderClient::new();
        client
            .expect_untag_resource()
            .withf(|arn, keys| arn == ARN && keys == [String::from("a"), String::from("b")])
            .times(1)
            .returning(|_, _| Ok(()));

        let current = provider()
            .with_arn(ARN)
            .with_tags(Tags::from([("b", "2"), ("a", "1")]));
        let proc = procedure(ProcedureKind::RemoveTags, Some(current), Some(provider()), client);
        tokio_test::assert_ok!(proc.execute().await);
    }

    #[tokio::test]
    async fn test_wait_polls_until_active() {
        let mut client = MockIdentityProviderClient::new();
        let mut seq = mockall::Sequence::new();
        client
            .expect_describe()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(Some(provider().with_status(ConfigStatus::Creating))));
        client
            .expect_describe()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(Some(provider().with_status(ConfigStatus::Active))));

        let current = provider().with_status(ConfigStatus::Creating);
        let wait = WaitSettings {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(1),
        };
        let plan = IdentityProviderPlan::new("prod", Some(current), Some(provider()), Arc::new(client))
            .with_wait(wait);
        let proc = Procedure::new(ProcedureKind::WaitUntilAssociated, plan.context());

        tokio_test::assert_ok!(proc.execute().await);
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let mut client = MockIdentityProviderClient::new();
        client
            .expect_describe()
            .returning(|_, _| Ok(Some(provider().with_status(ConfigStatus::Creating))));

        let current = provider().with_status(ConfigStatus::Creating);
        let proc = procedure(
            ProcedureKind::WaitUntilAssociated,
            Some(current),
            Some(provider()),
            client,
        );

        let err = proc.execute().await.unwrap_err();
        assert!(matches!(err, IdpError::Procedure(ProcedureError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_wait_fails_when_provider_disappears() {
        let mut client = MockIdentityProviderClient::new();
        client.expect_describe().times(1).returning(|_, _| Ok(None));

        let current = provider().with_status(ConfigStatus::Creating);
        let proc = procedure(
            ProcedureKind::WaitUntilAssociated,
            Some(current),
            Some(provider()),
            client,
        );

        let err = proc.execute().await.unwrap_err();
        assert!(matches!(err, IdpError::Procedure(ProcedureError::Failed { .. })));
    }
}
