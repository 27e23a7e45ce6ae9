//! Conversions between EKS API shapes and the planner's snapshot model.

use aws_sdk_eks::types::OidcIdentityProviderConfig as EksOidcConfig;

use crate::config::{ConfigStatus, OidcIdentityProviderConfig, Tags};

impl From<&EksOidcConfig> for OidcIdentityProviderConfig {
    fn from(observed: &EksOidcConfig) -> Self {
        Self {
            name: observed
                .identity_provider_config_name()
                .unwrap_or_default()
                .to_string(),
            issuer_url: observed.issuer_url().unwrap_or_default().to_string(),
            client_id: observed.client_id().unwrap_or_default().to_string(),
            username_claim: observed.username_claim().map(String::from),
            username_prefix: observed.username_prefix().map(String::from),
            groups_claim: observed.groups_claim().map(String::from),
            groups_prefix: observed.groups_prefix().map(String::from),
            required_claims: observed
                .required_claims()
                .map(|claims| {
                    claims
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect()
                })
                .unwrap_or_default(),
            tags: observed
                .tags()
                .map(|tags| {
                    tags.iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect::<Tags>()
                })
                .unwrap_or_default(),
            arn: observed.identity_provider_config_arn().map(String::from),
            status: observed
                .status()
                .map(|status| ConfigStatus::from(status.as_str())),
        }
    }
}
