use gstorage::errors::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AwsFetcherError {
    #[error("{service} {operation} failed: {message}")]
    Service {
        service: &'static str,
        operation: &'static str,
        message: String,
    },

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("AWS SDK error: {0}")]
    Sdk(String),
}

impl AwsFetcherError {
    pub fn service(
        service: &'static str,
        operation: &'static str,
        message: impl Into<String>,
    ) -> Self {
        AwsFetcherError::Service {
            service,
            operation,
            message: message.into(),
        }
    }
}

impl From<AwsFetcherError> for StorageError {
    fn from(err: AwsFetcherError) -> Self {
        match err {
            AwsFetcherError::Json(e) => StorageError::Json(e),
            AwsFetcherError::Io(e) => StorageError::Io(e),
            AwsFetcherError::InvalidParam(msg) => StorageError::InvalidArg(msg),
            other => StorageError::Enumeration(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, AwsFetcherError>;
