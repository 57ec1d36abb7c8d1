//! Error types for Stepwise

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using Stepwise's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Stepwise error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Syntax error in {file} at line {line}, column {column}")]
    Syntax {
        file: String,
        line: usize,
        column: usize,
    },

    #[error("Unsupported language: {language}")]
    Unsupported { language: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Instrumentation error: {message}")]
    Instrumentation { message: String },

    #[error("No instrumentation found in program output ({stdout_lines} lines captured)")]
    MissingInstrumentation { stdout_lines: usize },

    #[error("Viewport not found: {id}")]
    ViewportNotFound { id: String },

    #[error("Runner error: {message}")]
    Runner { message: String },

    #[error("Program timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}
