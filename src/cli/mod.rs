//! CLI module for the identity provider planner.
//!
//! This module provides the command-line interface for planning and
//! reconciling a cluster's OIDC identity provider association.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
