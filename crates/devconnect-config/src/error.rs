//! Errors raised while loading configuration or resolving paths.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    /// A config value failed validation.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid API base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// `config.json` is not valid JSON for [`Config`](crate::Config).
    #[error("malformed config file: {0}")]
    Json(#[from] serde_json::Error),

    /// No home directory to place `~/.devconnect` under.
    #[error("cannot resolve client directory: {0}")]
    Path(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
