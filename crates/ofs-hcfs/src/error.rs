use ofs_client::ClientError;

/// Why a block-location query failed. Callers never get a partial answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocateError {
    #[error("file not found: {0}")]
    NotFound(String),

    /// The requested range is outside `[0, file_length]`.
    #[error("invalid range: offset {offset} length {length} for file of {file_length} bytes")]
    InvalidRange {
        offset: u64,
        length: u64,
        file_length: u64,
    },

    /// Transport, timeout or availability failure after the client's
    /// retries.
    #[error("io error: {0}")]
    Io(String),

    #[error("corrupt metadata for {path}: {reason}")]
    CorruptMetadata { path: String, reason: String },
}

impl From<ClientError> for LocateError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound(path) => LocateError::NotFound(path),
            ClientError::CorruptMetadata { path, reason } => {
                LocateError::CorruptMetadata { path, reason }
            }
            other => LocateError::Io(other.to_string()),
        }
    }
}
