//! EKS integration module.
//!
//! This module provides the client used to observe and mutate a cluster's
//! OIDC identity provider association.

mod client;
mod types;

pub use client::{EksClient, IdentityProviderClient, OIDC_TYPE};

#[cfg(test)]
pub use client::MockIdentityProviderClient;
