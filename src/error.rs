//! Error types for the identity provider planner.
//!
//! This module provides the error hierarchy for every stage of a
//! reconciliation pass: configuration, EKS API calls, planning, and
//! procedure execution.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the identity provider planner.
#[derive(Debug, Error)]
pub enum IdpError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// EKS API errors.
    #[error("EKS API error: {0}")]
    Eks(#[from] EksError),

    /// Planning errors.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// Procedure execution errors.
    #[error("Procedure error: {0}")]
    Procedure(#[from] ProcedureError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },
}

/// EKS API errors.
#[derive(Debug, Error)]
pub enum EksError {
    /// The cluster does not exist.
    #[error("Cluster not found: {cluster}")]
    ClusterNotFound {
        /// Name of the missing cluster.
        cluster: String,
    },

    /// API request failed.
    #[error("EKS {operation} failed: {message}")]
    RequestFailed {
        /// Operation that failed.
        operation: String,
        /// Error message from the service.
        message: String,
    },

    /// Request was throttled.
    #[error("EKS {operation} throttled: {message}")]
    Throttled {
        /// Operation that was throttled.
        operation: String,
        /// Error message from the service.
        message: String,
    },

    /// Network or dispatch failure.
    #[error("Network error communicating with EKS: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// A request could not be built from the configuration.
    #[error("Invalid EKS request: {message}")]
    InvalidRequest {
        /// Description of the problem.
        message: String,
    },
}

/// Planning errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A procedure could not be constructed from the plan inputs.
    ///
    /// The current decision table never produces this; it is reserved for
    /// construction-time checks.
    #[error("Invalid procedure {procedure}: {message}")]
    InvalidProcedure {
        /// Name of the procedure.
        procedure: String,
        /// Description of the problem.
        message: String,
    },
}

/// Procedure execution errors.
#[derive(Debug, Error)]
pub enum ProcedureError {
    /// The procedure needs an input the plan does not carry.
    #[error("Procedure {procedure} is missing {input}")]
    MissingInput {
        /// Name of the procedure.
        procedure: String,
        /// Name of the missing input.
        input: String,
    },

    /// Waiting for the association to become active timed out.
    #[error("Timeout waiting for identity provider '{provider}' on cluster '{cluster}' to become active")]
    Timeout {
        /// Cluster name.
        cluster: String,
        /// Identity provider config name.
        provider: String,
    },

    /// The procedure failed.
    #[error("Failed executing procedure {procedure}: {reason}")]
    Failed {
        /// Name of the procedure.
        procedure: String,
        /// Reason for failure.
        reason: String,
    },
}

/// Result type alias for planner operations.
pub type Result<T> = std::result::Result<T, IdpError>;

impl IdpError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Eks(EksError::Throttled { .. } | EksError::NetworkError { .. })
        )
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::Eks(EksError::Throttled { .. }) => Some(10),
            Self::Eks(EksError::NetworkError { .. }) => Some(5),
            _ => None,
        }
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl EksError {
    /// Creates a request error for an operation.
    #[must_use]
    pub fn request(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }
}

impl ProcedureError {
    /// Creates a missing-input error.
    #[must_use]
    pub fn missing(procedure: impl Into<String>, input: impl Into<String>) -> Self {
        Self::MissingInput {
            procedure: procedure.into(),
            input: input.into(),
        }
    }
}
