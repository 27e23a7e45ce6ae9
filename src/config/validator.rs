//! Configuration validation for identity provider specs.
//!
//! This module validates the desired configuration before it is planned,
//! catching values the EKS API would reject.

use crate::error::{ConfigError, IdpError, Result};
use tracing::debug;

use super::spec::{ClusterConfig, OidcIdentityProviderConfig, PlannerConfig, Tags, WaitConfig};

/// Maximum number of tags on a resource.
const MAX_TAGS: usize = 50;

/// Maximum tag key length.
const MAX_TAG_KEY_LEN: usize = 128;

/// Maximum tag value length.
const MAX_TAG_VALUE_LEN: usize = 256;

/// Maximum cluster name length.
const MAX_CLUSTER_NAME_LEN: usize = 100;

/// Reserved tag key prefix.
const RESERVED_TAG_PREFIX: &str = "aws:";

/// Validator for planner configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ValidationResult {
    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a planner configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any check fails.
    pub fn validate(&self, config: &PlannerConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        Self::validate_cluster(&config.cluster, &mut result);
        Self::validate_wait(config.wait, &mut result);

        match &config.identity_provider {
            Some(provider) => Self::validate_provider(provider, &mut result),
            None => result.warnings.push(String::from(
                "No identity provider defined: any associated provider will be disassociated",
            )),
        }

        if let Some(first_error) = result.errors.first() {
            Err(IdpError::Config(ConfigError::validation(
                first_error.message.clone(),
                first_error.field.clone(),
            )))
        } else {
            debug!("Configuration validation passed");
            Ok(result)
        }
    }

    /// Validates cluster configuration.
    fn validate_cluster(cluster: &ClusterConfig, result: &mut ValidationResult) {
        if cluster.name.is_empty() {
            result.error("cluster.name", "Cluster name cannot be empty");
        } else if !is_valid_cluster_name(&cluster.name) {
            result.error(
                "cluster.name",
                format!(
                    "Cluster name '{}' is invalid. Must start with an alphanumeric character and contain only alphanumerics, hyphens and underscores.",
                    cluster.name
                ),
            );
        }

        if cluster.region.as_ref().is_some_and(String::is_empty) {
            result.error("cluster.region", "Region cannot be empty when specified");
        }
    }

    /// Validates wait settings.
    fn validate_wait(wait: WaitConfig, result: &mut ValidationResult) {
        if wait.timeout_secs == 0 {
            result.error("wait.timeout_secs", "Wait timeout must be greater than zero");
        }
        if wait.poll_interval_secs == 0 {
            result.error(
                "wait.poll_interval_secs",
                "Poll interval must be greater than zero",
            );
        }
        if wait.poll_interval_secs > wait.timeout_secs {
            result.warnings.push(format!(
                "wait.poll_interval_secs ({}) exceeds wait.timeout_secs ({})",
                wait.poll_interval_secs, wait.timeout_secs
            ));
        }
    }

    /// Validates the desired identity provider.
    fn validate_provider(provider: &OidcIdentityProviderConfig, result: &mut ValidationResult) {
        let prefix = "identity_provider";

        if provider.name.is_empty() {
            result.error(format!("{prefix}.name"), "Identity provider name cannot be empty");
        }

        if !provider.issuer_url.starts_with("https://") {
            result.error(
                format!("{prefix}.issuer_url"),
                format!("Issuer URL '{}' must use https://", provider.issuer_url),
            );
        }

        if provider.client_id.is_empty() {
            result.error(format!("{prefix}.client_id"), "Client ID cannot be empty");
        }

        if provider.required_claims.keys().any(String::is_empty) {
            result.error(
                format!("{prefix}.required_claims"),
                "Required claim keys cannot be empty",
            );
        }

        if provider.status.is_some() || provider.arn.is_some() {
            result.warnings.push(format!(
                "{prefix}.status and {prefix}.arn are observed values and are ignored"
            ));
        }

        Self::validate_tags(&provider.tags, &format!("{prefix}.tags"), result);
    }

    /// Validates tags.
    fn validate_tags(tags: &Tags, field: &str, result: &mut ValidationResult) {
        if tags.len() > MAX_TAGS {
            result.error(
                field,
                format!("At most {MAX_TAGS} tags are allowed, found {}", tags.len()),
            );
        }

        for (key, value) in tags.iter() {
            if key.is_empty() || key.chars().count() > MAX_TAG_KEY_LEN {
                result.error(
                    format!("{field}.{key}"),
                    format!("Tag key must be 1 to {MAX_TAG_KEY_LEN} characters"),
                );
            }
            if key.to_ascii_lowercase().starts_with(RESERVED_TAG_PREFIX) {
                result.error(
                    format!("{field}.{key}"),
                    format!("Tag key '{key}' uses the reserved '{RESERVED_TAG_PREFIX}' prefix"),
                );
            }
            if value.chars().count() > MAX_TAG_VALUE_LEN {
                result.error(
                    format!("{field}.{key}"),
                    format!("Tag value must be at most {MAX_TAG_VALUE_LEN} characters"),
                );
            }
        }
    }
}

/// Checks whether a cluster name is well-formed.
fn is_valid_cluster_name(name: &str) -> bool {
    name.len() <= MAX_CLUSTER_NAME_LEN
        && name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
