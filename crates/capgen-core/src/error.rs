//! Error types for the capgen captioning pipeline.
//!
//! Errors are organized by concern so callers can tell a bad settings file
//! apart from a failed caption request or a broken export.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for capgen operations.
#[derive(Error, Debug)]
pub enum CapgenError {
    /// Settings-related errors
    #[error("Settings error: {0}")]
    Config(#[from] ConfigError),

    /// Captioning and export errors
    #[error("Caption error: {0}")]
    Caption(#[from] CaptionError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Settings-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the settings file from disk
    #[error("Failed to read settings file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML settings
    #[error("Failed to parse settings: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Settings values are invalid
    #[error("Invalid settings: {0}")]
    ValidationError(String),

    /// A template references an endpoint that does not exist
    #[error("No endpoint named '{0}'")]
    UnknownEndpoint(String),

    /// A requested prompt template does not exist
    #[error("No prompt template named '{0}'")]
    UnknownTemplate(String),
}

/// Errors raised while captioning items or exporting results.
#[derive(Error, Debug)]
pub enum CaptionError {
    /// The caption service call failed (transport, HTTP status, or malformed body)
    #[error("Caption service error: {message}")]
    Client {
        message: String,
        status_code: Option<u16>,
    },

    /// The source image could not be read
    #[error("Failed to read image {path}: {message}")]
    ImageRead { path: PathBuf, message: String },

    /// The caption request exceeded its deadline
    #[error("Caption request for {path} timed out after {timeout_ms}ms")]
    Timeout { path: PathBuf, timeout_ms: u64 },

    /// The dataset archive could not be written; the whole export is aborted
    #[error("Archive export failed: {message}")]
    Archive { message: String },

    /// A loose caption file could not be written (per-item, siblings unaffected)
    #[error("Failed to write caption {path}: {message}")]
    CaptionWrite { path: PathBuf, message: String },
}

/// Convenience type alias for capgen results.
pub type Result<T> = std::result::Result<T, CapgenError>;

/// Convenience type alias for captioning/export results.
pub type CaptionResult<T> = std::result::Result<T, CaptionError>;
