//! Errors raised at the external I/O boundary (storage, import, export).
//!
//! Annotation operations themselves never fail; they either apply or are
//! silently ignored.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("document {index} not found")]
    DocumentNotFound { index: usize },

    /// Failure reported by a storage backend that has no richer error type
    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ProjectNotFound("Demo".to_string());
        assert_eq!(err.to_string(), "project not found: Demo");

        let err = Error::DocumentNotFound { index: 3 };
        assert_eq!(err.to_string(), "document 3 not found");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
