use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{CategoryId, DomainError, DomainResult};

/// Maximum category name length (characters).
pub const MAX_CATEGORY_NAME_LEN: usize = 100;

/// A named grouping of products.
///
/// Names are unique across categories, compared case-insensitively after
/// trimming (see [`name_key`]). The stored name keeps the caller's casing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    id: CategoryId,
    name: String,
    created_at: DateTime<Utc>,
}

impl Category {
    /// Create a new category from a validated command.
    pub fn create(id: CategoryId, cmd: &CreateCategory, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id,
            name: normalize_name(&cmd.name)?,
            created_at: now,
        })
    }

    /// Rebuild a category from persisted state.
    pub fn restore(id: CategoryId, name: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            created_at,
        }
    }

    pub fn id_typed(&self) -> CategoryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Uniqueness key of this category's name.
    pub fn name_key(&self) -> String {
        name_key(&self.name)
    }

    /// Rename the category. Uniqueness is enforced by the store.
    pub fn rename(&mut self, name: &str) -> DomainResult<()> {
        self.name = normalize_name(name)?;
        Ok(())
    }
}

/// Command: CreateCategory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCategory {
    pub name: String,
}

/// Command: RenameCategory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameCategory {
    pub name: String,
}

/// Trim and validate a category name.
pub fn normalize_name(name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid("name", "cannot be empty"));
    }
    if trimmed.chars().count() > MAX_CATEGORY_NAME_LEN {
        return Err(DomainError::invalid(
            "name",
            format!("must be at most {MAX_CATEGORY_NAME_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Key under which category names are compared for uniqueness.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
