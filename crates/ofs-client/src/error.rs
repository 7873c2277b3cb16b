//! Client error types.

use ofs_config::ConfigError;
use ofs_types::{MetaCode, Status};

/// Errors that can occur while fetching a file's extent map.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The layout is internally inconsistent and cannot be normalized.
    #[error("corrupt metadata for {path}: {reason}")]
    CorruptMetadata { path: String, reason: String },

    /// A server or the transport returned a non-OK status.
    #[error("status error: {0}")]
    Status(#[from] Status),

    /// No control-plane endpoint is available to handle the request.
    #[error("no server available: {0}")]
    NoServerAvailable(String),

    /// Retry budget exhausted.
    #[error("retry exhausted after {attempts} attempts: {message}")]
    RetryExhausted { attempts: u32, message: String },

    #[error("config error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn corrupt(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ClientError::CorruptMetadata {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Map a terminal status for `path` to the most specific variant.
    pub(crate) fn from_status(status: Status, path: &str) -> Self {
        match status.code() {
            MetaCode::NOT_FOUND => ClientError::NotFound(path.to_string()),
            MetaCode::BAD_LAYOUT => ClientError::corrupt(
                path,
                status.message().unwrap_or("server rejected layout").to_string(),
            ),
            _ => ClientError::Status(status),
        }
    }
}

impl From<ConfigError> for ClientError {
    fn from(err: ConfigError) -> Self {
        ClientError::Config(err.to_string())
    }
}

/// Convenience result type.
pub type ClientResult<T> = std::result::Result<T, ClientError>;
