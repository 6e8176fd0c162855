//! Secret store error types.
//!
//! This module defines all error types that can occur during secret store operations.

use std::fmt;

use crate::types::Scope;

/// Errors that can occur during secret store operations.
#[derive(Debug, thiserror::Error)]
pub enum SecretStoreError {
    /// The requested record was not found.
    #[error("Secret not found: {name} in {scope}")]
    NotFound {
        /// The name of the record that was not found.
        name: String,
        /// The scope that was searched.
        scope: Scope,
    },

    /// Attempted to create a record that already exists.
    #[error("Secret already exists: {name} in {scope}")]
    AlreadyExists {
        /// The name of the record that already exists.
        name: String,
        /// The scope of the existing record.
        scope: Scope,
    },

    /// Failed to reach the storage backend.
    #[error("Connection error: {message}")]
    ConnectionError {
        /// Description of the connection error.
        message: String,
    },

    /// An internal storage error occurred.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl SecretStoreError {
    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(name: impl Into<String>, scope: Scope) -> Self {
        Self::NotFound {
            name: name.into(),
            scope,
        }
    }

    /// Creates a new `AlreadyExists` error.
    #[must_use]
    pub fn already_exists(name: impl Into<String>, scope: Scope) -> Self {
        Self::AlreadyExists {
            name: name.into(),
            scope,
        }
    }

    /// Creates a new `ConnectionError` error.
    #[must_use]
    pub fn connection_error(message: impl Into<String>) -> Self {
        Self::ConnectionError {
            message: message.into(),
        }
    }

    /// Creates a new `Internal` error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is an already exists error.
    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns `true` if the operation may succeed when retried later.
    ///
    /// Only connectivity failures are transient; a missing or duplicate
    /// record will not change by retrying the same call.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionError { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::AlreadyExists { .. } => ErrorCategory::Conflict,
            Self::ConnectionError { .. } => ErrorCategory::Infrastructure,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }
}

/// Categories of secret store errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Record not found.
    NotFound,
    /// Record already exists.
    Conflict,
    /// Infrastructure/connection error.
    Infrastructure,
    /// Internal error.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Conflict => write!(f, "conflict"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SecretStoreError::not_found("user-token-signing-key-1", Scope::Global);
        assert_eq!(
            err.to_string(),
            "Secret not found: user-token-signing-key-1 in global"
        );

        let err = SecretStoreError::already_exists("signing-key-2", Scope::mesh("default"));
        assert_eq!(
            err.to_string(),
            "Secret already exists: signing-key-2 in mesh:default"
        );
    }

    #[test]
    fn test_error_predicates() {
        let err = SecretStoreError::not_found("a", Scope::Global);
        assert!(err.is_not_found());
        assert!(!err.is_already_exists());
        assert!(!err.is_transient());

        let err = SecretStoreError::already_exists("a", Scope::Global);
        assert!(err.is_already_exists());
        assert!(!err.is_transient());

        assert!(SecretStoreError::connection_error("refused").is_transient());
        assert!(!SecretStoreError::internal("boom").is_transient());
    }

    #[test]
    fn test_error_category() {
        assert_eq!(
            SecretStoreError::not_found("a", Scope::Global).category(),
            ErrorCategory::NotFound
        );
        assert_eq!(
            SecretStoreError::already_exists("a", Scope::Global).category(),
            ErrorCategory::Conflict
        );
        assert_eq!(
            SecretStoreError::connection_error("x").category(),
            ErrorCategory::Infrastructure
        );
        assert_eq!(ErrorCategory::Conflict.to_string(), "conflict");
    }
}
