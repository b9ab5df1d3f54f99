//! Error types for chordsmith-services

use chordsmith_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Template {id}: {source}")]
    InvalidPattern {
        id: String,
        #[source]
        source: CoreError,
    },
    #[error("Template not found: {0}")]
    TemplateNotFound(String),
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Cannot play pattern: {0}")]
    InvalidPattern(#[source] CoreError),
    #[error("JSON export failed: {0}")]
    Json(#[source] serde_json::Error),
}

impl From<CoreError> for PlaybackError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Json(err) => Self::Json(err),
            other => Self::InvalidPattern(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
