use thiserror::Error;

/// Failures reported by a generation backend before the session classifies them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// The service refused the request (policy filter, bad input, auth).
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// Network, timeout or server-side failure.
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Caught locally before anything was sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown backend: {0}")]
    UnknownBackend(String),

    #[error("Missing API key for backend: {0}")]
    MissingApiKey(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Insufficient credits: {required} required, {available} available")]
    InsufficientCredits { required: u64, available: u64 },

    #[error("A generation is already in progress")]
    AlreadyInProgress,

    #[error("Generation rejected: {0}")]
    RemoteRejected(String),

    #[error("Generation service unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Generation returned no usable result")]
    InvalidResult,

    #[error("Generation cost must be at least 1 credit")]
    InvalidCost,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Account error: {0}")]
    Account(AccountError),

    #[error("Corrupt session snapshot: {0}")]
    CorruptSnapshot(String),
}

impl From<AccountError> for SessionError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::InsufficientCredits {
                required,
                available,
            } => SessionError::InsufficientCredits {
                required,
                available,
            },
            other => SessionError::Account(other),
        }
    }
}

impl From<BackendError> for SessionError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Rejected(msg) => SessionError::RemoteRejected(msg),
            BackendError::Unavailable(msg) => SessionError::RemoteUnavailable(msg),
            BackendError::InvalidRequest(msg) => SessionError::InvalidRequest(msg),
            other => SessionError::InvalidRequest(other.to_string()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccountError {
    #[error("Insufficient credits: {required} required, {available} available")]
    InsufficientCredits { required: u64, available: u64 },

    #[error("Account not found: {0}")]
    NotFound(String),

    #[error("Account storage failed: {0}")]
    Storage(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid value: {0}")]
    Invalid(String),
}

impl From<StorageError> for AccountError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => AccountError::NotFound(what),
            other => AccountError::Storage(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file error: {0}")]
    File(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
