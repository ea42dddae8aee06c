use thiserror::Error;

/// Errors surfaced by the guard.
///
/// Variants carry owned messages so one failure can be handed to every
/// waiter of a coalesced scan.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GuardError {
    /// Transport failure or non-success status from the scan service.
    #[error("network error: {0}")]
    Network(String),

    /// A platform capability (e.g. proxy control) is not available.
    #[error("permission error: {0}")]
    Permission(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed or oversized host message.
    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("timed out after {0} ms")]
    Timeout(u64),

    #[error("cancelled")]
    Cancelled,

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl GuardError {
    /// Short machine-readable code used in `{success:false, error}` replies.
    pub fn code(&self) -> &'static str {
        match self {
            GuardError::Network(_) => "network_error",
            GuardError::Permission(_) => "permissions_missing",
            GuardError::Storage(_) => "storage_error",
            GuardError::Config(_) => "config_error",
            GuardError::Protocol(_) => "protocol_error",
            GuardError::Timeout(_) => "timeout",
            GuardError::Cancelled => "cancelled",
            GuardError::InvalidInput(_) => "invalid_input",
        }
    }
}

impl From<reqwest::Error> for GuardError {
    fn from(err: reqwest::Error) -> Self {
        GuardError::Network(err.to_string())
    }
}

impl From<rusqlite::Error> for GuardError {
    fn from(err: rusqlite::Error) -> Self {
        GuardError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for GuardError {
    fn from(err: serde_json::Error) -> Self {
        GuardError::Protocol(err.to_string())
    }
}

impl From<std::io::Error> for GuardError {
    fn from(err: std::io::Error) -> Self {
        GuardError::Protocol(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GuardError>;
