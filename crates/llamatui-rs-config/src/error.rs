//! Error types for settings persistence and field validation.

use thiserror::Error;

/// Errors returned while reading or writing the settings file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the settings file failed.
    #[error("settings io failed: {0}")]
    Io(#[from] std::io::Error),
    /// The settings file is not valid JSON5.
    #[error("failed to parse settings: {0}")]
    ParseFailed(#[from] json5::Error),
    /// Converting between the record and JSON values failed.
    #[error("failed to encode settings: {0}")]
    EncodeFailed(#[from] serde_json::Error),
    /// The settings file does not contain an object at the top level.
    #[error("settings root must be an object")]
    NotAnObject,
}

/// Errors produced when an operator-supplied value is rejected.
///
/// The display strings are shown verbatim in the status line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The input is not an integer.
    #[error("Invalid number format.")]
    InvalidNumber,
    /// The integer is below the field minimum.
    #[error("Value must be {min} or greater.")]
    BelowMinimum { min: u32 },
    /// The port is outside 1..=65535.
    #[error("Port must be between 1 and 65535.")]
    InvalidPort,
    /// The host is blank.
    #[error("Host IP cannot be empty.")]
    EmptyHost,
    /// The path does not name an existing directory.
    #[error("Invalid directory path.")]
    InvalidDirectory,
    /// The schedule time is not `HH:MM`.
    #[error("Invalid time format. Use HH:MM")]
    InvalidTime,
}
