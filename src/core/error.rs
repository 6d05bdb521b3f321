use thiserror::Error;

/// Failures surfaced by `EntityStore` operations.
///
/// Every message is meant for direct display to an end user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Could not load {0}")]
    LoadFailed(String),

    #[error("Could not create {0}")]
    CreateFailed(String),

    #[error("Could not update {0}")]
    UpdateFailed(String),

    #[error("Could not delete {0}")]
    DeleteFailed(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failures reported by a `RemoteResource` implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("'{0}' does not exist on the server")]
    NotFound(String),

    #[error("the server could not be reached ({0})")]
    Transport(String),

    #[error("the server rejected the request: {message}")]
    Server { status: u16, message: String },

    #[error("your session has expired, please sign in again")]
    Unauthorized,

    #[error("the server sent an unreadable response ({0})")]
    Decode(String),

    #[error("the server refused the change: {0}")]
    Rejected(String),
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;
