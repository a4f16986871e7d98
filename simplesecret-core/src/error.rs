//! Error types for `simplesecret`
//!
//! Each concern has its own `thiserror` enum and `Result` alias. The
//! session-and-consent engine reports everything through [`SecretError`];
//! the bus layer reports through [`BusError`], which is either reclassified
//! by the engine or wrapped as [`SecretError::Bus`].

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors raised by the remote-call collaborator
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// The addressed object does not exist (deleted item, unknown session)
    #[error("No such object: {0}")]
    NoSuchObject(String),

    /// The service does not support the requested algorithm or method
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// The object is locked and the call needs it unlocked
    #[error("Object is locked: {0}")]
    IsLocked(String),

    /// Any other failed remote call
    #[error("Call to {method} failed: {message}")]
    Call {
        /// Remote method name
        method: String,
        /// Reason reported by the service or transport
        message: String,
    },

    /// The bus connection is gone
    #[error("Bus disconnected: {0}")]
    Disconnected(String),
}

impl BusError {
    /// Creates a generic call failure
    pub fn call(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Call {
            method: method.into(),
            message: message.into(),
        }
    }
}

/// Result type for bus operations
pub type BusResult<T> = std::result::Result<T, BusError>;

/// Errors of the session-and-consent engine
#[derive(Debug, Error)]
pub enum SecretError {
    /// The secret service cannot be reached or negotiated with
    #[error("Secret service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Key exchange was malformed or rejected
    #[error("Transport handshake failed: {0}")]
    HandshakeFailed(String),

    /// Encryption or decryption failed, including session mismatch
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// A required input was missing or empty
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Consent was required but not obtained, or a forbidden operation
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// The user did not answer a prompt in time
    #[error("Prompt {prompt} was not answered within {timeout:?}")]
    PromptTimeout {
        /// Object path of the prompt
        prompt: String,
        /// Timeout that elapsed
        timeout: Duration,
    },

    /// No collection or item for the given label or path
    #[error("Not found: {0}")]
    NotFound(String),

    /// Remote call failure that is not reclassified
    #[error(transparent)]
    Bus(#[from] BusError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SecretError {
    /// Returns true for errors caused by the user withholding consent
    #[must_use]
    pub const fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied(_))
    }
}

/// Result type for secret operations
pub type SecretResult<T> = std::result::Result<T, SecretError>;

/// Errors related to client configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse configuration file
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// Configuration validation failed
    #[error("Invalid configuration value for {field}: {reason}")]
    Validation {
        /// Field that failed validation
        field: String,
        /// Reason for the failure
        reason: String,
    },

    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    /// Failed to write configuration
    #[error("Failed to write configuration: {0}")]
    Write(String),

    /// Failed to serialize configuration
    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
