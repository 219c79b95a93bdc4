use thiserror::Error;

/// Failure of a backend call or of a single deletion job.
///
/// Kept `Clone` so a failed job can carry its error inside every snapshot
/// taken after the failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CleanerError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("response status code is {status}: {message}")]
    RemoteRejected { status: u16, message: String },

    #[error("error from the homeserver: {0}")]
    RemoteOperationFailed(String),

    #[error("cancelled")]
    Cancelled,

    #[error("filesystem error: {0}")]
    Io(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("worker aborted: {0}")]
    Worker(String),
}

impl From<reqwest::Error> for CleanerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CleanerError::Decode(err.to_string())
        } else {
            CleanerError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CleanerError {
    fn from(err: serde_json::Error) -> Self {
        CleanerError::Decode(err.to_string())
    }
}

impl From<std::io::Error> for CleanerError {
    fn from(err: std::io::Error) -> Self {
        CleanerError::Io(err.to_string())
    }
}

impl From<sqlx::Error> for CleanerError {
    fn from(err: sqlx::Error) -> Self {
        CleanerError::Database(err.to_string())
    }
}

/// Errors raised while setting up the batch executor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExecutorError {
    #[error("a batch needs at least one work item")]
    NoItems,

    #[error("max_concurrent_jobs must be at least 1")]
    ZeroConcurrency,
}

/// Errors raised by the terminal renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("standard output is not an interactive terminal")]
    NotATerminal,

    #[error("terminal error: {0}")]
    Io(#[from] std::io::Error),
}
