//! `stockroom-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the money value object and the shared error model.

pub mod error;
pub mod id;
pub mod money;

pub use error::{DomainError, DomainResult, ErrorKind};
pub use id::{CategoryId, ProductId};
pub use money::Money;
pub use rust_decimal::Decimal;
