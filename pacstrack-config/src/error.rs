use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse client configuration: {0}")]
    Parse(#[source] anyhow::Error),
    #[error("invalid server URL '{url}'")]
    InvalidServerUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("{field} must be greater than zero")]
    ZeroInterval { field: &'static str },
}
