pub type ApiResult<T> = Result<T, ApiError>;
pub type CacheResult<T> = Result<T, CacheError>;

/// Failures talking to the storage server.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Malformed response from {url}: {message}")]
    Malformed { url: String, message: String },
}

impl ApiError {
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn malformed(url: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Malformed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Malformed payloads are never retried or rendered partially.
    pub fn is_malformed(&self) -> bool {
        matches!(self, ApiError::Malformed { .. })
    }
}

/// Failures of the persisted view cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache I/O error: {0}")]
    Io(String),

    #[error("Cache entry {key} failed integrity check: {message}")]
    Integrity { key: String, message: String },

    #[error("Cache entry {key} could not be decoded")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Value for cache entry {key} could not be encoded")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Outcome of a rejected or failed job submission.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("{trigger} is already running")]
    Busy { trigger: String },

    #[error("No rows selected")]
    EmptySelection,

    #[error("No row at position {0}")]
    NoSuchRow(usize),

    #[error(transparent)]
    Api(#[from] ApiError),
}
