// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::module_inception)]    // Module with same name as crate warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning
#![warn(clippy::too_many_arguments)]  // Limit function arguments
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # idp-planner
//!
//! Declarative reconciliation of an EKS cluster's OIDC identity provider
//! association.
//!
//! ## Overview
//!
//! Given the desired identity provider configuration and the one currently
//! associated with a cluster, the planner computes an ordered list of
//! procedures that moves the cluster one step closer to the desired state:
//!
//! - Associate a provider when none exists
//! - Disassociate a provider that is no longer wanted or whose immutable
//!   configuration changed
//! - Update or remove tags on a provider whose configuration matches
//! - Wait for an association that is still being created
//!
//! ## Architecture
//!
//! 1. **Desired State**: Defined in `idp.yaml`
//! 2. **Observed State**: Queried from the EKS API (or a snapshot file)
//! 3. **Planner**: Compares both and emits procedures
//! 4. **Reconciler**: Observes, plans and executes one pass
//!
//! ## Modules
//!
//! - [`config`]: Configuration types, parsing and validation
//! - [`eks`]: EKS identity provider client
//! - [`planner`]: Plan construction and procedure execution
//! - [`reconciler`]: Single-pass reconciliation
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! cluster:
//!   name: prod
//!   region: eu-west-1
//!
//! identity_provider:
//!   name: okta
//!   issuer_url: https://example.okta.com
//!   client_id: kubernetes
//!   username_claim: email
//!   groups_claim: groups
//!   tags:
//!     team: platform
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod eks;
pub mod error;
pub mod planner;
pub mod reconciler;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigHasher, ConfigParser, ConfigValidator, OidcIdentityProviderConfig, PlannerConfig};
pub use eks::{EksClient, IdentityProviderClient};
pub use error::{IdpError, Result};
pub use planner::{IdentityProviderPlan, PlanExecutor, Procedure, ProcedureKind};
pub use reconciler::{PlanReport, ReconciliationResult, Reconciler};
