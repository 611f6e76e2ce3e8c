use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure raised by a pipeline stage.
///
/// Stages propagate these unchanged; the runner only attaches the stage name.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum IngestError {
    /// Network or transport failure (timeout, connection reset, 5xx).
    #[error("transient error: {0}")]
    Transient(String),

    /// Rejected or malformed exchange (4xx, invalid JSON).
    #[error("permanent error: {0}")]
    Permanent(String),

    /// Sink unreachable or statement rejected.
    #[error("storage error: {0}")]
    Storage(String),
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transient(_) => ErrorKind::Transient,
            Self::Permanent(_) => ErrorKind::Permanent,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether the invoker may re-trigger the run without intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Classification of an [`IngestError`], as reported on failed runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Transient,
    Permanent,
    Storage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transient => "transient",
            Self::Permanent => "permanent",
            Self::Storage => "storage",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_is_retryable() {
        assert!(IngestError::Transient("timeout".into()).is_retryable());
        assert!(!IngestError::Permanent("404".into()).is_retryable());
        assert!(!IngestError::Storage("down".into()).is_retryable());
    }

    #[test]
    fn kind_serializes_snake_case() {
        let err = IngestError::Storage("connection refused".into());
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert_eq!(serde_json::to_string(&err.kind()).unwrap(), r#""storage""#);
        assert_eq!(err.to_string(), "storage error: connection refused");
    }

    #[test]
    fn error_serializes_with_kind_tag() {
        let err = IngestError::Permanent("404 Not Found".into());
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            serde_json::json!({"kind": "permanent", "message": "404 Not Found"})
        );
    }
}
