//! Domain error model.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// uniqueness, stock invariants). Infrastructure concerns belong elsewhere.
///
/// Every variant carries the offending id or field so a caller can render a
/// specific message without parsing text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An unknown product or category id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Another category already uses this name.
    #[error("category name already in use: {name}")]
    DuplicateName { name: String },

    /// Another product already uses this SKU.
    #[error("sku already in use: {sku}")]
    DuplicateSku { sku: String },

    /// Applying the delta would drive the quantity below zero.
    #[error("insufficient stock for product {product_id} (available: {available}, change: {delta})")]
    InsufficientStock {
        product_id: String,
        available: u64,
        delta: i64,
    },

    /// A value failed validation (empty name, negative price, zero delta...).
    #[error("invalid {field}: {reason}")]
    InvalidInput { field: &'static str, reason: String },
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn duplicate_name(name: impl Into<String>) -> Self {
        Self::DuplicateName { name: name.into() }
    }

    pub fn duplicate_sku(sku: impl Into<String>) -> Self {
        Self::DuplicateSku { sku: sku.into() }
    }

    pub fn insufficient_stock(product_id: impl ToString, available: u64, delta: i64) -> Self {
        Self::InsufficientStock {
            product_id: product_id.to_string(),
            available,
            delta,
        }
    }

    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Flat discriminant of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::DuplicateName { .. } => ErrorKind::DuplicateName,
            DomainError::DuplicateSku { .. } => ErrorKind::DuplicateSku,
            DomainError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            DomainError::InvalidInput { .. } => ErrorKind::InvalidInput,
        }
    }
}

/// Error kinds as seen by callers (batch outcomes, API error codes).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    DuplicateName,
    DuplicateSku,
    InsufficientStock,
    InvalidInput,
    /// Storage backend failure (connection lost, poisoned lock).
    Storage,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::DuplicateName => "duplicate_name",
            ErrorKind::DuplicateSku => "duplicate_sku",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Storage => "storage",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
