//! Store-level errors: domain failures plus backend failures.

use thiserror::Error;

use stockroom_core::{DomainError, ErrorKind};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Deterministic domain failure (not found, duplicate, insufficient stock...).
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The storage backend failed (connection, poisoned lock, corrupt row).
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Domain(e) => e.kind(),
            StoreError::Backend(_) => ErrorKind::Storage,
        }
    }
}
