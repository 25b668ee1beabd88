//! Error types for the check engine.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::data::UnitParseError;

/// Errors that abort a check run before any result is produced.
#[derive(Debug, Error)]
pub enum CheckError {
    /// The display unit could not be parsed.
    #[error(transparent)]
    Unit(#[from] UnitParseError),

    /// A value that must be a finite number was not.
    #[error("Non-numeric input: {0}")]
    NonNumericInput(String),

    /// Reading the kernel counters failed.
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The kernel counters could not be parsed.
    #[error("Cannot parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// An interface exclusion pattern is not a valid regular expression.
    #[error("Invalid interface pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The configuration is inconsistent.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The config file or environment could not be loaded.
    #[error("Cannot load settings: {0}")]
    Settings(#[from] config::ConfigError),
}

/// Errors raised while persisting the counter state.
///
/// These never abort a run; the engine turns them into a note.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Cannot write in {}.", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Cannot remove {}: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
