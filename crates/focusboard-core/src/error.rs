//! Core error types for focusboard-core.
//!
//! The countdown engine is pure in-memory state, so its taxonomy is narrow;
//! configuration I/O carries the rest.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for focusboard-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Countdown engine errors
    #[error("Timer error: {0}")]
    Timer(#[from] TimerError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by countdown engine commands.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    /// Preset index outside the catalog
    #[error("Preset index {index} out of bounds (catalog length: {len})")]
    InvalidPreset { index: usize, len: usize },

    /// Preset switch attempted during an active countdown
    #[error("Cannot switch presets while the countdown is running")]
    PresetLockedWhileRunning,

    /// No preset with the requested id
    #[error("Unknown preset id: {0}")]
    UnknownPresetId(String),

    /// Catalog supplied with no presets
    #[error("Preset catalog must contain at least one preset")]
    EmptyCatalog,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
