//! EKS client for identity provider associations.
//!
//! This module defines the remote capability the procedures consume and
//! its implementation on top of the AWS SDK.

use async_trait::async_trait;
use aws_sdk_eks::Client;
use aws_sdk_eks::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_eks::operation::describe_identity_provider_config::DescribeIdentityProviderConfigError;
use aws_sdk_eks::operation::list_identity_provider_configs::ListIdentityProviderConfigsError;
use aws_sdk_eks::types::{IdentityProviderConfig, OidcIdentityProviderConfigRequest};
use tracing::{debug, info};

use crate::config::{OidcIdentityProviderConfig, Tags};
use crate::error::{EksError, IdpError, Result};

/// Identity provider type managed by this crate.
pub const OIDC_TYPE: &str = "oidc";

/// Error codes the service uses for throttling.
const THROTTLING_CODES: &[&str] = &["ThrottlingException", "TooManyRequestsException"];

/// Remote operations on a cluster's identity provider association.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProviderClient: Send + Sync {
    /// Describes an identity provider config by name.
    ///
    /// Returns `None` if the cluster has no config with that name.
    async fn describe(&self, cluster: &str, name: &str)
    -> Result<Option<OidcIdentityProviderConfig>>;

    /// Finds the OIDC identity provider associated with a cluster.
    ///
    /// Returns `None` if there is none.
    async fn find_current(&self, cluster: &str) -> Result<Option<OidcIdentityProviderConfig>>;

    /// Associates an identity provider config, tags included.
    async fn associate(&self, cluster: &str, config: &OidcIdentityProviderConfig) -> Result<()>;

    /// Disassociates an identity provider config.
    async fn disassociate(&self, cluster: &str, name: &str) -> Result<()>;

    /// Adds or overwrites tags on a resource.
    async fn tag_resource(&self, arn: &str, tags: &Tags) -> Result<()>;

    /// Removes tags from a resource.
    async fn untag_resource(&self, arn: &str, keys: &[String]) -> Result<()>;
}

/// AWS SDK backed identity provider client.
#[derive(Debug, Clone)]
pub struct EksClient {
    /// EKS client.
    client: Client,
}

impl EksClient {
    /// Creates a client from the AWS environment.
    pub async fn from_env(region: Option<&str>) -> Self {
        let config = if let Some(region_str) = region {
            aws_config::from_env()
                .region(aws_config::Region::new(region_str.to_string()))
                .load()
                .await
        } else {
            aws_config::load_from_env().await
        };

        Self {
            client: Client::new(&config),
        }
    }

    /// Creates a client without loading credentials or probing the environment.
    ///
    /// Requests sent through it fail; it backs plans that are only displayed.
    #[must_use]
    pub fn offline(region: Option<&str>) -> Self {
        let mut builder =
            aws_sdk_eks::Config::builder().behavior_version(aws_sdk_eks::config::BehaviorVersion::latest());
        if let Some(region_str) = region {
            builder = builder.region(aws_sdk_eks::config::Region::new(region_str.to_string()));
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    /// Creates a client with an existing SDK client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IdentityProviderClient for EksClient {
    async fn describe(
        &self,
        cluster: &str,
        name: &str,
    ) -> Result<Option<OidcIdentityProviderConfig>> {
        debug!("Describing identity provider {name} on cluster {cluster}");

        let result = self
            .client
            .describe_identity_provider_config()
            .cluster_name(cluster)
            .identity_provider_config(oidc_reference(name)?)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output
                .identity_provider_config()
                .and_then(|config| config.oidc())
                .map(OidcIdentityProviderConfig::from)),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(DescribeIdentityProviderConfigError::is_resource_not_found_exception) =>
            {
                debug!("Identity provider {name} not found on cluster {cluster}");
                Ok(None)
            }
            Err(err) => Err(map_sdk_error("DescribeIdentityProviderConfig", &err)),
        }
    }

    async fn find_current(&self, cluster: &str) -> Result<Option<OidcIdentityProviderConfig>> {
        debug!("Listing identity providers on cluster {cluster}");

        let output = match self
            .client
            .list_identity_provider_configs()
            .cluster_name(cluster)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(ListIdentityProviderConfigsError::is_resource_not_found_exception) =>
            {
                return Err(IdpError::Eks(EksError::ClusterNotFound {
                    cluster: cluster.to_string(),
                }));
            }
            Err(err) => return Err(map_sdk_error("ListIdentityProviderConfigs", &err)),
        };

        let Some(reference) = output
            .identity_provider_configs()
            .iter()
            .find(|config| config.r#type() == OIDC_TYPE)
        else {
            debug!("No OIDC identity provider on cluster {cluster}");
            return Ok(None);
        };

        self.describe(cluster, reference.name()).await
    }

    async fn associate(&self, cluster: &str, config: &OidcIdentityProviderConfig) -> Result<()> {
        info!("Associating identity provider {} with cluster {cluster}", config.name);

        let request = OidcIdentityProviderConfigRequest::builder()
            .identity_provider_config_name(&config.name)
            .issuer_url(&config.issuer_url)
            .client_id(&config.client_id)
            .set_username_claim(non_empty(config.username_claim.as_deref()))
            .set_username_prefix(non_empty(config.username_prefix.as_deref()))
            .set_groups_claim(non_empty(config.groups_claim.as_deref()))
            .set_groups_prefix(non_empty(config.groups_prefix.as_deref()))
            .set_required_claims(
                (!config.required_claims.is_empty()).then(|| {
                    config
                        .required_claims
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect()
                }),
            )
            .build()
            .map_err(|e| EksError::InvalidRequest {
                message: e.to_string(),
            })?;

        self.client
            .associate_identity_provider_config()
            .cluster_name(cluster)
            .oidc(request)
            .set_tags((!config.tags.is_empty()).then(|| config.tags.to_hash_map()))
            .send()
            .await
            .map_err(|e| map_sdk_error("AssociateIdentityProviderConfig", &e))?;

        Ok(())
    }

    async fn disassociate(&self, cluster: &str, name: &str) -> Result<()> {
        info!("Disassociating identity provider {name} from cluster {cluster}");

        self.client
            .disassociate_identity_provider_config()
            .cluster_name(cluster)
            .identity_provider_config(oidc_reference(name)?)
            .send()
            .await
            .map_err(|e| map_sdk_error("DisassociateIdentityProviderConfig", &e))?;

        Ok(())
    }

    async fn tag_resource(&self, arn: &str, tags: &Tags) -> Result<()> {
        debug!("Tagging {arn} with {} tags", tags.len());

        self.client
            .tag_resource()
            .resource_arn(arn)
            .set_tags(Some(tags.to_hash_map()))
            .send()
            .await
            .map_err(|e| map_sdk_error("TagResource", &e))?;

        Ok(())
    }

    async fn untag_resource(&self, arn: &str, keys: &[String]) -> Result<()> {
        debug!("Removing {} tags from {arn}", keys.len());

        self.client
            .untag_resource()
            .resource_arn(arn)
            .set_tag_keys(Some(keys.to_vec()))
            .send()
            .await
            .map_err(|e| map_sdk_error("UntagResource", &e))?;

        Ok(())
    }
}

/// Builds the `{type, name}` reference the EKS API uses for a config.
fn oidc_reference(name: &str) -> Result<IdentityProviderConfig> {
    IdentityProviderConfig::builder()
        .r#type(OIDC_TYPE)
        .name(name)
        .build()
        .map_err(|e| {
            IdpError::Eks(EksError::InvalidRequest {
                message: e.to_string(),
            })
        })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(String::from)
}

/// Maps an SDK error onto the crate's EKS error taxonomy.
fn map_sdk_error<E, R>(operation: &str, err: &SdkError<E, R>) -> IdpError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(err).to_string();

    let eks_error = match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => EksError::network(message),
        _ if err.code().is_some_and(|code| THROTTLING_CODES.contains(&code)) => {
            EksError::Throttled {
                operation: operation.to_string(),
                message,
            }
        }
        _ => EksError::request(operation, message),
    };

    IdpError::Eks(eks_error)
}
