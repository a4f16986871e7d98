//! CLI error types and exit codes.

use simplesecret_core::{BusError, ConfigError, SecretError};

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, validation, missing items
    pub const GENERAL_ERROR: i32 = 1;
    /// The secret service could not be reached or negotiated with
    pub const SERVICE_UNAVAILABLE: i32 = 2;
    /// The user denied access or dismissed a prompt
    pub const ACCESS_DENIED: i32 = 3;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Collection or item not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Secret service unreachable
    #[error("Secret service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Access denied by the user or by policy
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The user dismissed a prompt
    #[error("Dismissed: {0}")]
    Dismissed(String),

    /// The user did not answer a prompt in time
    #[error("Timed out: {0}")]
    Timeout(String),

    /// Any other secret service failure
    #[error("Secret error: {0}")]
    Secret(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SecretError> for CliError {
    fn from(err: SecretError) -> Self {
        match err {
            SecretError::ServiceUnavailable(_)
            | SecretError::HandshakeFailed(_)
            | SecretError::Bus(BusError::Disconnected(_)) => {
                Self::ServiceUnavailable(err.to_string())
            }
            SecretError::AccessDenied(reason) => Self::AccessDenied(reason),
            SecretError::Validation(reason) => Self::Validation(reason),
            SecretError::NotFound(what) => Self::NotFound(what),
            SecretError::PromptTimeout { .. } => Self::Timeout(err.to_string()),
            SecretError::Config(e) => e.into(),
            other => Self::Secret(other.to_string()),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: General error (configuration, validation, not found, IO)
    /// - 2: Secret service unavailable
    /// - 3: Access denied or prompt dismissed
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ServiceUnavailable(_) => exit_codes::SERVICE_UNAVAILABLE,
            Self::AccessDenied(_) | Self::Dismissed(_) => exit_codes::ACCESS_DENIED,
            Self::Config(_)
            | Self::Validation(_)
            | Self::NotFound(_)
            | Self::Timeout(_)
            | Self::Secret(_)
            | Self::Io(_) => exit_codes::GENERAL_ERROR,
        }
    }
}
