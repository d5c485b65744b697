//! Error types for the streaming controller.

use thiserror::Error;

/// Errors surfaced by the `Listen` streaming controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ListenError {
    #[error("malformed listen request: {0}")]
    InvalidRequest(String),
}

impl From<ListenError> for tonic::Status {
    fn from(err: ListenError) -> Self {
        match err {
            ListenError::InvalidRequest(msg) => tonic::Status::invalid_argument(msg),
        }
    }
}
