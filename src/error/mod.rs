//! Error types and handlers for registry login operations

pub mod handlers;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Malformed server name, missing username, empty credentials
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Credentials rejected by the registry (4xx)
    #[error("Authentication failed (status {status}): {message}")]
    Auth { status: u16, message: String },
    /// Server-side failure (5xx) on a single attempt
    #[error("Registry error (status {status}): {message}")]
    Transient { status: u16, message: String },
    /// Connection-level failure on a single attempt
    #[error("Network error: {0}")]
    Network(String),
    #[error("Registry still unavailable after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<RegistryError>,
    },
    #[error("Unexpected registry response (status {status}): {message}")]
    UnexpectedStatus { status: u16, message: String },
    /// Credentials verified but could not be saved
    #[error("Login verified but credentials were not saved: {0}")]
    Store(#[from] StoreError),
    #[error("Login interrupted before credentials were saved")]
    Cancelled,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    /// Store locked, unavailable or refusing access
    #[error("Credential store access denied: {0}")]
    AccessDenied(String),
    #[error("Credential store write failed: {0}")]
    Io(String),
    #[error("Stored credential is unreadable: {0}")]
    Serialization(String),
}

/// Coarse classification of a failed login, recorded in the terminal state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidArgument,
    Auth,
    /// Registry answered outside the v2 protocol
    Protocol,
    Transient,
    Store,
    Cancelled,
    Local,
}

impl RegistryError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RegistryError::InvalidArgument(_) | RegistryError::Config(_) => {
                FailureKind::InvalidArgument
            }
            RegistryError::Auth { .. } => FailureKind::Auth,
            RegistryError::UnexpectedStatus { .. } => FailureKind::Protocol,
            RegistryError::Transient { .. }
            | RegistryError::Network(_)
            | RegistryError::RetriesExhausted { .. } => FailureKind::Transient,
            RegistryError::Store(_) => FailureKind::Store,
            RegistryError::Cancelled => FailureKind::Cancelled,
            RegistryError::Io(_) => FailureKind::Local,
        }
    }

    /// Whether another probe attempt could change the outcome
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RegistryError::Transient { .. } | RegistryError::Network(_)
        )
    }
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        RegistryError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => StoreError::AccessDenied(err.to_string()),
            _ => StoreError::Io(err.to_string()),
        }
    }
}

impl From<keyring::Error> for StoreError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::NoStorageAccess(e) => StoreError::AccessDenied(e.to_string()),
            keyring::Error::PlatformFailure(e) => StoreError::Io(e.to_string()),
            other => StoreError::Io(other.to_string()),
        }
    }
}
