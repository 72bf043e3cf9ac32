//! Mapper error types with reason codes.

use thiserror::Error;

/// Reason codes for mapper errors, providing machine-readable context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonCode {
    /// A required input argument was wholly absent (null).
    MissingInput = 100,
    /// A value had a different kind than the mapper can work with.
    TypeMismatch = 200,
    /// Any other failure raised by control-authored code.
    Failed = 300,
}

/// Errors a detail or display mapper may return.
///
/// Only [`MapperError::MissingInput`] and [`MapperError::TypeMismatch`] are
/// narrowly scoped; the harness tolerates them solely when a required input
/// was null.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MapperError {
    /// A required argument was null.
    #[error("Missing input (reason {reason}): argument '{argument}' is null")]
    MissingInput { reason: u32, argument: String },

    /// A value had the wrong kind.
    #[error(
        "Type mismatch (reason {reason}) at {path}: expected {expected}, found {found}"
    )]
    TypeMismatch {
        reason: u32,
        path: String,
        expected: String,
        found: String,
    },

    /// Uncategorised failure.
    #[error("Mapper failed (reason {reason}): {message}")]
    Failed { reason: u32, message: String },
}

impl MapperError {
    pub fn missing_input(argument: impl Into<String>) -> Self {
        Self::MissingInput {
            reason: ReasonCode::MissingInput as u32,
            argument: argument.into(),
        }
    }

    pub fn type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            reason: ReasonCode::TypeMismatch as u32,
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            reason: ReasonCode::Failed as u32,
            message: message.into(),
        }
    }

    /// Whether this is one of the narrowly-typed input errors.
    pub fn is_narrow(&self) -> bool {
        matches!(self, Self::MissingInput { .. } | Self::TypeMismatch { .. })
    }
}

impl From<serde_json::Error> for MapperError {
    fn from(err: serde_json::Error) -> Self {
        Self::failed(format!("serialization failed: {}", err))
    }
}

/// Result type returned by mappers.
pub type MapperResult<T> = std::result::Result<T, MapperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_kinds() {
        assert!(MapperError::missing_input("occurrence").is_narrow());
        let mismatch = MapperError::type_mismatch("$.detail", "mapping", "string");
        assert!(mismatch.is_narrow());
        assert!(!MapperError::failed("boom").is_narrow());
    }

    #[test]
    fn reason_codes_are_carried() {
        match MapperError::failed("boom") {
            MapperError::Failed { reason, .. } => assert_eq!(reason, 300),
            other => panic!("unexpected variant: {other:?}"),
        }
        let msg = MapperError::missing_input("context").to_string();
        assert!(msg.contains("'context'"));
    }
}
