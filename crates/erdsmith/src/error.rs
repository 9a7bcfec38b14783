//! Error types for the erdsmith library.
//!
//! Only infrastructure failures are raised as errors. Data-level problems in a
//! diagram (bad names, missing keys, malformed blocks) are collected as
//! [`ValidationIssue`](crate::validation::ValidationIssue)s instead.

use std::path::PathBuf;
use thiserror::Error;

use crate::input::SyntaxError;

/// Main error type for erdsmith operations.
#[derive(Debug, Error)]
pub enum ErdError {
    /// Error reading or accessing a file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input bytes were not valid UTF-8.
    #[error("Input is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// Input contained nothing but whitespace.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Parsing recovered no entity at all.
    #[error("No recoverable entities in diagram ({} syntax error(s))", syntax_errors.len())]
    NoEntities { syntax_errors: Vec<SyntaxError> },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML configuration could not be parsed.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from the CSV writer.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for erdsmith operations.
pub type Result<T> = std::result::Result<T, ErdError>;
