//! Configuration parser for loading the desired identity provider file.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling. It also loads
//! observed snapshots used for offline planning.

use crate::error::{ConfigError, IdpError, Result};
use std::path::Path;
use tracing::{debug, info};

use super::spec::{OidcIdentityProviderConfig, PlannerConfig};

/// Configuration parser for loading planner configuration.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<PlannerConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let content = read_file(path)?;
        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<PlannerConfig> {
        debug!("Parsing YAML configuration");

        let config: PlannerConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            IdpError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!("Successfully parsed configuration for cluster: {}", config.cluster.name);
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// Recognized variables: `IDP_CLUSTER_NAME`, `IDP_REGION`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<PlannerConfig> {
        let mut config = self.load_file(path)?;

        Self::apply_env_overrides(&mut config);

        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(config: &mut PlannerConfig) {
        if let Ok(name) = std::env::var("IDP_CLUSTER_NAME") {
            debug!("Overriding cluster.name from environment");
            config.cluster.name = name;
        }

        if let Ok(region) = std::env::var("IDP_REGION") {
            debug!("Overriding cluster.region from environment");
            config.cluster.region = Some(region);
        }
    }

    /// Loads an observed identity provider snapshot (YAML or JSON).
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_snapshot(&self, path: impl AsRef<Path>) -> Result<OidcIdentityProviderConfig> {
        let path = path.as_ref();
        info!("Loading observed snapshot from: {}", path.display());

        let content = read_file(path)?;

        // JSON is a subset of YAML, one parser covers both.
        serde_yaml::from_str(&content).map_err(|e| {
            IdpError::Config(ConfigError::ParseError {
                message: format!("Snapshot parse error: {e}"),
                location: Some(path.display().to_string()),
            })
        })
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                IdpError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

fn read_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(IdpError::Config(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        }));
    }

    std::fs::read_to_string(path).map_err(|e| {
        IdpError::Config(ConfigError::ParseError {
            message: format!("Failed to read file: {e}"),
            location: Some(path.display().to_string()),
        })
    })
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["idp.yaml", "idp.yml", "identity-provider.yaml"];

/// Finds the configuration file in the given directory or its parents.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(IdpError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::spec::{ConfigStatus, WaitConfig};
    use tempfile::TempDir;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r"
cluster:
  name: prod-cluster
";
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).expect("minimal config should parse");

        assert_eq!(config.cluster.name, "prod-cluster");
        assert!(config.identity_provider.is_none());
        assert_eq!(config.wait, WaitConfig::default());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
cluster:
  name: prod-cluster
  region: eu-west-1

identity_provider:
  name: okta
  issuer_url: https://example.okta.com
  client_id: kubernetes
  username_claim: email
  username_prefix: "oidc:"
  groups_claim: groups
  groups_prefix: "oidc:"
  required_claims:
    hd: example.com
  tags:
    team: platform

wait:
  timeout_secs: 600
"#;
        let parser = ConfigParser::new();
        let config = parser.parse_yaml(yaml, None).expect("full config should parse");

        let provider = config.identity_provider.expect("provider should be set");
        assert_eq!(provider.name, "okta");
        assert_eq!(provider.username_prefix.as_deref(), Some("oidc:"));
        assert_eq!(provider.required_claims.get("hd").map(String::as_str), Some("example.com"));
        assert_eq!(provider.tags.get("team"), Some("platform"));
        assert!(provider.status.is_none());
        assert_eq!(config.cluster.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.wait.timeout_secs, 600);
        assert_eq!(config.wait.poll_interval_secs, 15);
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let parser = ConfigParser::new();
        let result = parser.parse_yaml("cluster: [", None);
        assert!(matches!(
            result,
            Err(IdpError::Config(ConfigError::ParseError { .. }))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let result = ConfigParser::new().load_file(temp.path().join("idp.yaml"));
        assert!(matches!(
            result,
            Err(IdpError::Config(ConfigError::FileNotFound { .. }))
        ));
    }

    #[test]
    fn test_load_json_snapshot() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("current.json");
        std::fs::write(
            &path,
            r#"{"name":"okta","issuer_url":"https://example.okta.com","client_id":"kubernetes","status":"CREATING","tags":{"team":"platform"}}"#,
        )
        .expect("Failed to write snapshot");

        let snapshot = ConfigParser::new()
            .load_snapshot(&path)
            .expect("snapshot should parse");

        assert_eq!(snapshot.status, Some(ConfigStatus::Creating));
        assert_eq!(snapshot.tags.get("team"), Some("platform"));
    }

    #[test]
    fn test_find_config_file_in_parent() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let nested = temp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("Failed to create dirs");
        std::fs::write(temp.path().join("idp.yml"), "cluster:\n  name: c\n")
            .expect("Failed to write config");

        let found = find_config_file(&nested).expect("config should be found");
        assert_eq!(found, temp.path().join("idp.yml"));
    }
}
