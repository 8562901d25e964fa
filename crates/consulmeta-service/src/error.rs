//! Store client errors

use thiserror::Error;

/// Errors from the Consul store client
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Consul request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Consul returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid Consul response: {0}")]
    Decode(String),
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    /// HTTP status returned by Consul, if the request got that far
    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Status { status, .. } => Some(*status),
            StoreError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
