//! Error types for cadenza.

use thiserror::Error;

/// Result type alias using cadenza's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for cadenza tag governance operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Store query failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A role is already assigned for this (tag, user) pair
    #[error("Duplicate assignment: user {user_id} already has a role on tag '{tag}'")]
    DuplicateAssignment { tag: String, user_id: uuid::Uuid },

    /// Write would violate a uniqueness or structural constraint
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Malformed or missing input to a mutating call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON encoding of stored values failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Bad environment setting
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// No authenticated actor
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed to govern the tag
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// True for errors caused by the store or the process rather than the caller.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Error::Database(_) | Error::Serialization(_) | Error::Config(_) | Error::Internal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("permission".to_string());
        assert_eq!(err.to_string(), "Not found: permission");
    }

    #[test]
    fn test_error_display_duplicate_assignment() {
        let id = Uuid::nil();
        let err = Error::DuplicateAssignment {
            tag: "jazz".to_string(),
            user_id: id,
        };
        assert_eq!(
            err.to_string(),
            format!("Duplicate assignment: user {} already has a role on tag 'jazz'", id)
        );
    }

    #[test]
    fn test_caller_facing_messages() {
        let cases = [
            (
                Error::InvalidInput("tag name must not be empty".to_string()),
                "Invalid input: tag name must not be empty",
            ),
            (
                Error::Unauthorized("missing session".to_string()),
                "Unauthorized: missing session",
            ),
            (
                Error::Forbidden("admin role required".to_string()),
                "Forbidden: admin role required",
            ),
            (
                Error::Conflict("edge music -> rock exists".to_string()),
                "Conflict: edge music -> rock exists",
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_serde_json_error_is_internal() {
        let err: Error = serde_json::from_str::<Vec<String>>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, Error::Serialization(_)));
        assert!(err.is_internal());
    }

    #[test]
    fn test_is_internal() {
        assert!(Error::Internal("boom".to_string()).is_internal());
        assert!(Error::Database(sqlx::Error::RowNotFound).is_internal());
        assert!(!Error::NotFound("x".to_string()).is_internal());
        assert!(!Error::Conflict("x".to_string()).is_internal());
    }

    #[test]
    fn test_error_crosses_tasks() {
        fn shareable<T: Send + Sync + 'static>() {}
        shareable::<Error>();
    }
}
