//! Error types for pickup-core

use thiserror::Error;

/// Core error type for pickup operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// Remote store call failed or timed out
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Expected document or record missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller-side precondition violated
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Identity provider rejected the credentials or no user is signed in
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Document already exists (create-if-absent lost a race)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration value out of range or malformed
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Could not parse stored or configured data
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Filesystem errors while loading configuration
    #[error("IO error: {0}")]
    IoError(String),
}

impl Error {
    /// Create a validation error
    #[must_use]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::ValidationFailed(reason.into())
    }

    /// Create a not found error for an entity
    #[must_use]
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{entity} '{id}'"))
    }

    /// Create a store error
    #[must_use]
    pub fn store(reason: impl Into<String>) -> Self {
        Self::StoreUnavailable(reason.into())
    }

    /// Process exit code for this error category
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::ValidationFailed(_) | Self::InvalidConfig(_) | Self::ParseError(_) => 1,
            Self::NotFound(_) => 2,
            Self::StoreUnavailable(_) | Self::Conflict(_) | Self::IoError(_) => 3,
            Self::AuthFailed(_) => 4,
        }
    }

    /// Short message suitable for a transient user notification
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::StoreUnavailable(_) | Self::Conflict(_) => {
                "The service is not reachable right now. Please try again.".to_string()
            }
            Self::NotFound(what) => format!("{what} was not found."),
            Self::ValidationFailed(reason)
            | Self::AuthFailed(reason)
            | Self::InvalidConfig(reason)
            | Self::ParseError(reason)
            | Self::IoError(reason) => reason.clone(),
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError(err.to_string())
    }
}

/// Result type alias for pickup-core operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(Error::validation("x").exit_code(), 1);
        assert_eq!(Error::not_found("student", "s-1").exit_code(), 2);
        assert_eq!(Error::store("down").exit_code(), 3);
        assert_eq!(Error::AuthFailed("bad".into()).exit_code(), 4);
    }

    #[test]
    fn test_not_found_message_names_entity() {
        let err = Error::not_found("student", "s-1");
        assert_eq!(err.to_string(), "Not found: student 's-1'");
        assert_eq!(err.user_message(), "student 's-1' was not found.");
    }

    #[test]
    fn test_store_errors_hide_details_from_users() {
        let err = Error::store("database is locked");
        assert_eq!(
            err.user_message(),
            "The service is not reachable right now. Please try again."
        );
    }

    #[test]
    fn test_auth_failed_shows_its_reason() {
        let err = Error::AuthFailed("Please log in first.".into());
        assert_eq!(err.user_message(), "Please log in first.");
        assert_eq!(err.exit_code(), 4);
    }
}
