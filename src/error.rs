//! Error type shared by the data layer and the domain views.
//!
//! Failures fall in two user-facing classes: network trouble (the sheet or
//! the analyst could not be reached, or answered with an error) and
//! validation trouble (the form input was rejected). `Storage` covers the
//! local SQLite store and `Auth` covers login.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PosError {
    #[error("{0}")]
    Network(String),

    #[error("Remote service rejected the request: {0}")]
    Remote(String),

    #[error("{0}")]
    Validation(String),

    #[error("Local storage error: {0}")]
    Storage(String),

    #[error("{0}")]
    Auth(String),
}

impl PosError {
    pub fn validation(msg: impl Into<String>) -> Self {
        PosError::Validation(msg.into())
    }

    /// True for failures caused by the remote sheet or the network.
    pub fn is_network(&self) -> bool {
        matches!(self, PosError::Network(_) | PosError::Remote(_))
    }
}

impl From<rusqlite::Error> for PosError {
    fn from(err: rusqlite::Error) -> Self {
        PosError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for PosError {
    fn from(err: serde_json::Error) -> Self {
        PosError::Storage(format!("invalid cached JSON: {err}"))
    }
}

impl From<PosError> for String {
    fn from(err: PosError) -> String {
        err.to_string()
    }
}

pub type PosResult<T> = Result<T, PosError>;
