//! Configuration module for the identity provider planner.
//!
//! This module handles all configuration-related functionality:
//! - The identity provider snapshot model shared by desired and observed state
//! - Parsing and deserializing `idp.yaml`
//! - Validation of configuration values
//! - Fingerprinting of configuration-defining fields

mod spec;
mod parser;
mod validator;
mod hash;

pub use spec::{
    ClusterConfig, ConfigStatus, OidcIdentityProviderConfig, PlannerConfig, Tags, WaitConfig,
};
pub use parser::{ConfigParser, find_config_file};
pub use validator::{ConfigValidator, ValidationResult};
pub use hash::ConfigHasher;
