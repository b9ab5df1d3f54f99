//! Error types for chordsmith-core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    #[error("Unknown chord type: {0}")]
    UnknownChordType(String),
    #[error("Unknown progression style: {0}")]
    UnknownProgressionStyle(String),
    #[error("Unknown pitch class: {0}")]
    UnknownPitchClass(String),
    #[error("Unknown pattern kind: {0}")]
    UnknownPatternKind(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
