//! Harness error types with reason codes.
//!
//! These cover the harness's own environment (fixture I/O, configuration,
//! control lookup). Mapper misbehaviour is never an error here: it is
//! recorded as a violation in the report.

use thiserror::Error;

/// Reason codes for harness errors, providing machine-readable context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    /// File I/O failed.
    IoFailed = 100,
    /// A fixture is not valid JSON.
    FixtureFormat = 200,
    /// A named fixture does not exist.
    FixtureNotFound = 300,
    /// No control is registered under the requested name.
    UnknownControl = 400,
    /// A configuration value could not be parsed.
    ConfigInvalid = 500,
    /// Serialization or deserialization failed.
    SerializationFailed = 600,
}

/// Errors that can occur while preparing or running the harness.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// File I/O error.
    #[error("I/O error (reason {reason}): {message}")]
    Io { reason: u32, message: String },

    /// Fixture content could not be parsed.
    #[error("Fixture format error (reason {reason}) in '{fixture}': {message}")]
    FixtureFormat {
        reason: u32,
        fixture: String,
        message: String,
    },

    /// The requested fixture does not exist.
    #[error("Fixture not found (reason {reason}): {fixture}")]
    FixtureNotFound { reason: u32, fixture: String },

    /// The requested control is not registered.
    #[error("Unknown control (reason {reason}): '{name}'")]
    UnknownControl { reason: u32, name: String },

    /// Invalid configuration value.
    #[error("Config error (reason {reason}): {message}")]
    Config { reason: u32, message: String },

    /// Serialization or deserialization failed.
    #[error("Serialization error (reason {reason}): {message}")]
    Serialization { reason: u32, message: String },
}

impl HarnessError {
    pub fn io_error(message: impl Into<String>) -> Self {
        Self::Io {
            reason: ReasonCode::IoFailed as u32,
            message: message.into(),
        }
    }

    pub fn fixture_format(fixture: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FixtureFormat {
            reason: ReasonCode::FixtureFormat as u32,
            fixture: fixture.into(),
            message: message.into(),
        }
    }

    pub fn fixture_not_found(fixture: impl Into<String>) -> Self {
        Self::FixtureNotFound {
            reason: ReasonCode::FixtureNotFound as u32,
            fixture: fixture.into(),
        }
    }

    pub fn unknown_control(name: impl Into<String>) -> Self {
        Self::UnknownControl {
            reason: ReasonCode::UnknownControl as u32,
            name: name.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            reason: ReasonCode::ConfigInvalid as u32,
            message: message.into(),
        }
    }

    pub fn serialization_error(message: impl Into<String>) -> Self {
        Self::Serialization {
            reason: ReasonCode::SerializationFailed as u32,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for HarnessError {
    fn from(err: std::io::Error) -> Self {
        Self::io_error(err.to_string())
    }
}

impl From<serde_json::Error> for HarnessError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization_error(err.to_string())
    }
}

/// Result type for harness operations.
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;
