use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use stockroom_core::{CategoryId, Decimal, DomainError, DomainResult, Money, ProductId};

/// Threshold applied when a product is created without one.
pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 5;

/// Description stored when a product is created (or updated) without one.
pub const DEFAULT_DESCRIPTION: &str = "No description provided.";

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_SKU_LEN: usize = 50;

/// A catalog item with a stock quantity.
///
/// `quantity` is never negative and only changes through
/// [`Product::adjust_quantity`]; every other field is edited with
/// [`Product::apply_update`]. The category is a weak reference resolved by
/// lookup, never a copied name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    sku: String,
    name: String,
    description: String,
    price: Money,
    quantity: u64,
    category: Option<CategoryId>,
    low_stock_threshold: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Persisted product state, used by stores to rebuild a [`Product`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductParts {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub quantity: u64,
    pub category: Option<CategoryId>,
    pub low_stock_threshold: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Create a product from a command.
    ///
    /// Field validation and defaults happen here; SKU uniqueness and the
    /// existence of `category_id` are the store's responsibility.
    pub fn create(id: ProductId, cmd: &CreateProduct, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id,
            sku: normalize_sku(&cmd.sku)?,
            name: normalize_product_name(&cmd.name)?,
            description: description_or_default(cmd.description.as_deref()),
            price: validate_price(cmd.price)?,
            quantity: cmd.quantity,
            category: cmd.category_id,
            low_stock_threshold: cmd
                .low_stock_threshold
                .map(validate_threshold)
                .transpose()?
                .unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn restore(parts: ProductParts) -> Self {
        Self {
            id: parts.id,
            sku: parts.sku,
            name: parts.name,
            description: parts.description,
            price: parts.price,
            quantity: parts.quantity,
            category: parts.category,
            low_stock_threshold: parts.low_stock_threshold,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn category(&self) -> Option<CategoryId> {
        self.category
    }

    pub fn low_stock_threshold(&self) -> u32 {
        self.low_stock_threshold
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Stock value of this product (`price × quantity`).
    pub fn stock_value(&self) -> Money {
        self.price.times(self.quantity)
    }

    /// Apply a signed delta to the quantity and return the new quantity.
    ///
    /// Fails with `InsufficientStock` when the result would be negative; the
    /// product is left untouched on any error.
    pub fn adjust_quantity(&mut self, delta: i64, now: DateTime<Utc>) -> DomainResult<u64> {
        let next = apply_delta(self.id, self.quantity, delta)?;
        self.quantity = next;
        self.updated_at = now;
        Ok(next)
    }

    /// Apply an update. All fields are validated before any is written.
    ///
    /// A changed category reference must already have been checked against the
    /// category store by the caller.
    pub fn apply_update(&mut self, update: &UpdateProduct, now: DateTime<Utc>) -> DomainResult<()> {
        let sku = update.sku.as_deref().map(normalize_sku).transpose()?;
        let name = update.name.as_deref().map(normalize_product_name).transpose()?;
        let price = update.price.map(validate_price).transpose()?;
        let threshold = update.low_stock_threshold.map(validate_threshold).transpose()?;

        if let Some(sku) = sku {
            self.sku = sku;
        }
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = &update.description {
            self.description = description_or_default(Some(description));
        }
        if let Some(price) = price {
            self.price = price;
        }
        if let Some(category) = update.category_id {
            self.category = category;
        }
        if let Some(threshold) = threshold {
            self.low_stock_threshold = threshold;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Drop the category reference (the referenced category was deleted).
    pub fn clear_category(&mut self) {
        self.category = None;
    }
}

/// Command: CreateProduct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Validated into [`Money`] on creation.
    pub price: Decimal,
    /// Opening stock.
    #[serde(default)]
    pub quantity: u64,
    #[serde(default, alias = "category")]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
}

/// Command: UpdateProduct. Absent fields are left unchanged.
///
/// `category_id` distinguishes "absent" (`None`) from "set to null"
/// (`Some(None)`), which detaches the product from its category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProduct {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default, alias = "category", deserialize_with = "deserialize_some")]
    pub category_id: Option<Option<CategoryId>>,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
}

impl UpdateProduct {
    /// New category reference requested by this update, if it sets one.
    pub fn target_category(&self) -> Option<CategoryId> {
        self.category_id.flatten()
    }
}

fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Pure quantity rule shared by every store: `quantity + delta`, never below zero.
pub fn apply_delta(product_id: ProductId, quantity: u64, delta: i64) -> DomainResult<u64> {
    match quantity.checked_add_signed(delta) {
        Some(next) => Ok(next),
        None if delta < 0 => Err(DomainError::insufficient_stock(product_id, quantity, delta)),
        None => Err(DomainError::invalid("delta", "quantity would overflow")),
    }
}

pub fn normalize_sku(sku: &str) -> DomainResult<String> {
    let trimmed = sku.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid("sku", "cannot be empty"));
    }
    if trimmed.chars().count() > MAX_SKU_LEN {
        return Err(DomainError::invalid(
            "sku",
            format!("must be at most {MAX_SKU_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

fn normalize_product_name(name: &str) -> DomainResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::invalid("name", "cannot be empty"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::invalid(
            "name",
            format!("must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(trimmed.to_string())
}

fn validate_price(amount: Decimal) -> DomainResult<Money> {
    let price = Money::from_decimal(amount)?;
    if price > Money::MAX_PRICE {
        return Err(DomainError::invalid(
            "price",
            format!("must be at most {}", Money::MAX_PRICE),
        ));
    }
    Ok(price)
}

fn validate_threshold(threshold: i64) -> DomainResult<u32> {
    u32::try_from(threshold).map_err(|_| {
        if threshold < 0 {
            DomainError::invalid("low_stock_threshold", "must not be negative")
        } else {
            DomainError::invalid("low_stock_threshold", "too large")
        }
    })
}

fn description_or_default(description: Option<&str>) -> String {
    match description.map(str::trim) {
        Some(d) if !d.is_empty() => d.to_string(),
        _ => DEFAULT_DESCRIPTION.to_string(),
    }
}
