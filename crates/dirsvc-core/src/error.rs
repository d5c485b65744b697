//! Error types shared across the directory service event distribution core.

use std::fmt;

/// Top-level error type for `dirsvc-core` operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// A validation constraint was violated.
    Validation(String),
    /// A referenced entity was not found.
    NotFound(String),
    /// An internal/unexpected error.
    Internal(String),
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "validation error: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for DirectoryError {}
