//! Configuration hashing for change detection.
//!
//! The fingerprint covers exactly the configuration-defining fields of an
//! identity provider, so two configs that compare equal share a fingerprint
//! regardless of status, ARN or tags.

use sha2::{Digest, Sha256};

use super::spec::OidcIdentityProviderConfig;

/// Field separator, keeps `("ab", "c")` and `("a", "bc")` apart.
const SEPARATOR: [u8; 1] = [0];

/// Hasher for computing identity provider fingerprints.
#[derive(Debug, Default)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new configuration hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the fingerprint of an identity provider config.
    #[must_use]
    pub fn hash_provider(&self, provider: &OidcIdentityProviderConfig) -> String {
        let mut hasher = Sha256::new();

        for field in [
            provider.name.as_str(),
            provider.issuer_url.as_str(),
            provider.client_id.as_str(),
            provider.username_claim.as_deref().unwrap_or_default(),
            provider.username_prefix.as_deref().unwrap_or_default(),
            provider.groups_claim.as_deref().unwrap_or_default(),
            provider.groups_prefix.as_deref().unwrap_or_default(),
        ] {
            hasher.update(field.as_bytes());
            hasher.update(SEPARATOR);
        }

        // BTreeMap iteration is already sorted
        for (key, value) in &provider.required_claims {
            hasher.update(key.as_bytes());
            hasher.update(SEPARATOR);
            hasher.update(value.as_bytes());
            hasher.update(SEPARATOR);
        }

        hex::encode(hasher.finalize())
    }

    /// Returns a short version of a hash (first 8 characters).
    #[must_use]
    pub fn short_hash<'a>(&self, hash: &'a str) -> &'a str {
        hash.get(..8).unwrap_or(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::spec::{ConfigStatus, Tags};

    fn create_test_provider(name: &str) -> OidcIdentityProviderConfig {
        OidcIdentityProviderConfig::new(name, "https://example.okta.com", "kubernetes")
    }

    #[test]
    fn test_provider_hash_deterministic() {
        let hasher = ConfigHasher::new();
        let provider = create_test_provider("okta");

        assert_eq!(hasher.hash_provider(&provider), hasher.hash_provider(&provider));
    }

    #[test]
    fn test_different_providers_different_hash() {
        let hasher = ConfigHasher::new();

        assert_ne!(
            hasher.hash_provider(&create_test_provider("okta")),
            hasher.hash_provider(&create_test_provider("dex"))
        );
    }

    #[test]
    fn test_hash_ignores_lifecycle_fields() {
        let hasher = ConfigHasher::new();
        let desired = create_test_provider("okta");
        let observed = create_test_provider("okta")
            .with_status(ConfigStatus::Active)
            .with_arn("arn:aws:eks:eu-west-1:123456789012:identityproviderconfig/c/oidc/okta/1")
            .with_tags(Tags::from([("team", "platform")]));

        assert!(desired.is_equal(&observed));
        assert_eq!(hasher.hash_provider(&desired), hasher.hash_provider(&observed));
    }

    #[test]
    fn test_absent_optional_hashes_like_empty() {
        let hasher = ConfigHasher::new();
        let a = create_test_provider("okta");
        let mut b = create_test_provider("okta");
        b.groups_claim = Some(String::new());

        assert_eq!(hasher.hash_provider(&a), hasher.hash_provider(&b));
    }

    #[test]
    fn test_short_hash() {
        let hasher = ConfigHasher::new();
        let full_hash = "abcdef1234567890abcdef1234567890";
        let short = hasher.short_hash(full_hash);

        assert_eq!(short, "abcdef12");
        assert_eq!(hasher.short_hash("abc"), "abc");
    }
}
