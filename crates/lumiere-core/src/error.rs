//! Error types for lumiere-core
//!
//! Every failure degrades to a visible but non-blocking state; nothing here is fatal.

use thiserror::Error;

/// Core error type for lumiere operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // Remote Errors
    // ===================
    #[error("{operation} failed: upstream responded with status {status}")]
    UpstreamUnavailable { operation: String, status: u16 },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Sign in required")]
    Unauthenticated,

    // ===================
    // Validation Errors
    // ===================
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ===================
    // Local Storage Errors
    // ===================
    #[error("Stored value under '{key}' is malformed")]
    CacheCorrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage failure for '{key}'")]
    Storage {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize value: {0}")]
    Serialize(#[source] serde_json::Error),

    // ===================
    // Config Errors
    // ===================
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl CoreError {
    /// Build an upstream failure for a named remote operation
    pub fn upstream(operation: impl Into<String>, status: reqwest::StatusCode) -> Self {
        Self::UpstreamUnavailable {
            operation: operation.into(),
            status: status.as_u16(),
        }
    }

    /// True when the error came from a remote call (shown as an empty/error state)
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            CoreError::UpstreamUnavailable { .. } | CoreError::Http(_) | CoreError::Auth { .. }
        )
    }
}

/// Input rejected before any network call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please select a movie")]
    MissingMovie,

    #[error("Your ending must be between {min} and {max} words (got {count})")]
    WordCount { count: usize, min: usize, max: usize },

    #[error("Invalid email address")]
    Email,

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Display name must be at least {min} characters")]
    DisplayNameTooShort { min: usize },

    #[error("Display name must be less than {max} characters")]
    DisplayNameTooLong { max: usize },
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
