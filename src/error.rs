//! Error types for the highlighter
//!
//! Expected conditions (rejected selections, anchors that no longer resolve,
//! wraps that fail) are reported as values, never as errors. What remains here
//! are caller mistakes and input that cannot be loaded at all.

use thiserror::Error;

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, HighlightError>;

/// Highlighter error type
#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("Invalid container: {0}")]
    InvalidContainer(String),

    #[error("Color not in palette: {0}")]
    UnknownColor(String),

    #[error("Highlight not found: {0}")]
    NotFound(String),

    #[error("Markup parsing error: {0}")]
    Markup(#[from] roxmltree::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid stored highlight: {0}")]
    InvalidRecord(String),
}
