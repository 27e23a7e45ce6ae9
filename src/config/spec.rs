//! Configuration specification types for the identity provider planner.
//!
//! This module defines the structs that map to the `idp.yaml` file and the
//! identity provider snapshot shared by the desired and observed sides.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Default timeout for an association to become active.
const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 1200;

/// Default delay between association status polls.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 15;

/// The root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Cluster the identity provider is associated with.
    pub cluster: ClusterConfig,
    /// Desired identity provider; absent means none should exist.
    #[serde(default)]
    pub identity_provider: Option<OidcIdentityProviderConfig>,
    /// Association wait settings.
    #[serde(default)]
    pub wait: WaitConfig,
}

/// Cluster configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterConfig {
    /// EKS cluster name.
    pub name: String,
    /// AWS region (uses the AWS default chain if not specified).
    #[serde(default)]
    pub region: Option<String>,
}

/// Settings for waiting on an association to complete.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WaitConfig {
    /// Maximum time to wait, in seconds.
    #[serde(default = "default_wait_timeout")]
    pub timeout_secs: u64,
    /// Delay between status polls, in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_WAIT_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

const fn default_wait_timeout() -> u64 {
    DEFAULT_WAIT_TIMEOUT_SECS
}

const fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

/// Lifecycle phase of an identity provider association.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConfigStatus {
    /// Association is complete.
    Active,
    /// Association is in progress.
    Creating,
    /// Disassociation is in progress.
    Deleting,
    /// Any status this crate does not recognize.
    Unknown(String),
}

impl ConfigStatus {
    /// Returns the wire form of the status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "ACTIVE",
            Self::Creating => "CREATING",
            Self::Deleting => "DELETING",
            Self::Unknown(other) => other,
        }
    }
}

impl From<&str> for ConfigStatus {
    fn from(value: &str) -> Self {
        if value.eq_ignore_ascii_case("ACTIVE") {
            Self::Active
        } else if value.eq_ignore_ascii_case("CREATING") {
            Self::Creating
        } else if value.eq_ignore_ascii_case("DELETING") {
            Self::Deleting
        } else {
            Self::Unknown(value.to_string())
        }
    }
}

impl From<String> for ConfigStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<ConfigStatus> for String {
    fn from(status: ConfigStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for ConfigStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key-value metadata attached to an identity provider config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tags(BTreeMap<String, String>);

impl Tags {
    /// Creates an empty tag set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Returns the entries of `self` that are missing from `other` or have
    /// a different value there. Keys only present in `other` are ignored.
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        self.0
            .iter()
            .filter(|(key, value)| other.0.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Inserts a tag, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Gets a tag value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns true if there are no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over tags in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    /// Iterates over tag keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Converts into the map shape expected by the EKS API.
    #[must_use]
    pub fn to_hash_map(&self) -> HashMap<String, String> {
        self.0.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

impl FromIterator<(String, String)> for Tags {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[(&str, &str); N]> for Tags {
    fn from(entries: [(&str, &str); N]) -> Self {
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

/// An OIDC identity provider configuration.
///
/// The same type describes both sides of a plan: the desired config written
/// by the user (no `status`, no `arn`) and the config observed on the
/// cluster.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OidcIdentityProviderConfig {
    /// Identity provider config name.
    pub name: String,
    /// OIDC issuer URL.
    pub issuer_url: String,
    /// OIDC client ID.
    pub client_id: String,
    /// JWT claim used as the username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_claim: Option<String>,
    /// Prefix prepended to username claims.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_prefix: Option<String>,
    /// JWT claim used for groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups_claim: Option<String>,
    /// Prefix prepended to group claims.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups_prefix: Option<String>,
    /// Key-value pairs that must be present in the ID token.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub required_claims: BTreeMap<String, String>,
    /// Tags on the identity provider config.
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub tags: Tags,
    /// ARN of the association (observed only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arn: Option<String>,
    /// Lifecycle status (observed only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ConfigStatus>,
}

impl OidcIdentityProviderConfig {
    /// Creates a config with the required fields set.
    #[must_use]
    pub fn new(name: &str, issuer_url: &str, client_id: &str) -> Self {
        Self {
            name: name.to_string(),
            issuer_url: issuer_url.to_string(),
            client_id: client_id.to_string(),
            ..Self::default()
        }
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }

    /// Sets the observed status.
    #[must_use]
    pub fn with_status(mut self, status: ConfigStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Sets the observed ARN.
    #[must_use]
    pub fn with_arn(mut self, arn: &str) -> Self {
        self.arn = Some(arn.to_string());
        self
    }

    /// Compares the configuration-defining fields.
    ///
    /// `status`, `arn` and `tags` are ignored. An absent optional string
    /// compares equal to an empty one.
    #[must_use]
    pub fn is_equal(&self, other: &Self) -> bool {
        self.name == other.name
            && self.issuer_url == other.issuer_url
            && self.client_id == other.client_id
            && same_value(self.username_claim.as_deref(), other.username_claim.as_deref())
            && same_value(self.username_prefix.as_deref(), other.username_prefix.as_deref())
            && same_value(self.groups_claim.as_deref(), other.groups_claim.as_deref())
            && same_value(self.groups_prefix.as_deref(), other.groups_prefix.as_deref())
            && self.required_claims == other.required_claims
    }

    /// Returns true if the observed status is `Active`.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == Some(ConfigStatus::Active)
    }
}

fn same_value(a: Option<&str>, b: Option<&str>) -> bool {
    a.unwrap_or_default() == b.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> OidcIdentityProviderConfig {
        let mut config = OidcIdentityProviderConfig::new(
            "okta",
            "https://example.okta.com",
            "kubernetes",
        );
        config.username_claim = Some(String::from("email"));
        config.groups_claim = Some(String::from("groups"));
        config
            .required_claims
            .insert(String::from("hd"), String::from("example.com"));
        config
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(ConfigStatus::from("ACTIVE"), ConfigStatus::Active);
        assert_eq!(ConfigStatus::from("creating"), ConfigStatus::Creating);
        assert_eq!(ConfigStatus::from("Deleting"), ConfigStatus::Deleting);
        assert_eq!(
            ConfigStatus::from("FAILED"),
            ConfigStatus::Unknown(String::from("FAILED"))
        );
        assert_eq!(ConfigStatus::Creating.to_string(), "CREATING");
    }

    #[test]
    fn test_is_equal_ignores_status_tags_and_arn() {
        let desired = create_test_config().with_tags(Tags::from([("team", "platform")]));
        let current = create_test_config()
            .with_status(ConfigStatus::Creating)
            .with_arn("arn:aws:eks:eu-west-1:123456789012:identityproviderconfig/prod/oidc/okta/1")
            .with_tags(Tags::from([("team", "infra"), ("owner", "sre")]));

        assert!(current.is_equal(&desired));
        assert!(desired.is_equal(&current));
        assert!(desired.is_equal(&desired));
    }

    #[test]
    fn test_is_equal_detects_core_changes() {
        let base = create_test_config();

        let mut issuer = base.clone();
        issuer.issuer_url = String::from("https://other.okta.com");
        assert!(!base.is_equal(&issuer));

        let mut claims = base.clone();
        claims.required_claims.clear();
        assert!(!base.is_equal(&claims));

        let mut prefix = base.clone();
        prefix.groups_prefix = Some(String::from("oidc:"));
        assert!(!base.is_equal(&prefix));
        assert!(!prefix.is_equal(&base));
    }

    #[test]
    fn test_absent_optional_equals_empty() {
        let mut a = create_test_config();
        let mut b = create_test_config();
        a.username_prefix = None;
        b.username_prefix = Some(String::new());

        assert!(a.is_equal(&b));
        assert!(b.is_equal(&a));
    }

    #[test]
    fn test_tags_difference_is_one_directional() {
        let desired = Tags::from([("a", "1"), ("b", "2"), ("c", "3")]);
        let current = Tags::from([("a", "1"), ("b", "old"), ("d", "4")]);

        let diff = desired.difference(&current);
        assert_eq!(diff, Tags::from([("b", "2"), ("c", "3")]));

        let reverse = current.difference(&desired);
        assert_eq!(reverse, Tags::from([("b", "old"), ("d", "4")]));
    }

    #[test]
    fn test_tags_difference_empty() {
        let tags = Tags::from([("a", "1")]);
        assert!(tags.difference(&tags).is_empty());
        assert!(Tags::new().difference(&tags).is_empty());
    }

    #[test]
    fn test_status_round_trips_through_yaml() {
        let config = create_test_config().with_status(ConfigStatus::Unknown(String::from("FAILED")));
        let yaml = serde_yaml::to_string(&config).expect("serialize");
        assert!(yaml.contains("status: FAILED"));

        let parsed: OidcIdentityProviderConfig = serde_yaml::from_str(&yaml).expect("deserialize");
        assert_eq!(parsed, config);
    }
}
