//! Fixed-precision money amounts.
//!
//! Amounts are held as integer minor units (cents) with exactly two decimal
//! places. Parsing and serde go through `rust_decimal`, so aggregation never
//! touches binary floating point.

use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

const SCALE: u64 = 100;
const FRACTION_DIGITS: u32 = 2;

/// Non-negative money amount with two decimal places.
///
/// Serialises as a decimal string (`"35.00"`); deserialises from strings or
/// JSON numbers.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(u64);

impl Money {
    /// Largest accepted price: 10 significant digits, 2 of them fractional.
    pub const MAX_PRICE: Money = Money(9_999_999_999);

    pub const ZERO: Money = Money(0);

    /// Build from minor units (cents).
    pub const fn from_minor(minor: u64) -> Self {
        Self(minor)
    }

    /// Build from whole units, e.g. `Money::from_major(10)` is `10.00`.
    pub fn from_major(major: u64) -> Self {
        Self(major.saturating_mul(SCALE))
    }

    pub const fn minor(self) -> u64 {
        self.0
    }

    /// Value of `quantity` units at this price. Saturates instead of wrapping.
    pub fn times(self, quantity: u64) -> Money {
        Money(self.0.saturating_mul(quantity))
    }

    pub fn saturating_add(self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    /// Convert a decimal, rejecting negatives and more than two fractional digits.
    pub fn from_decimal(amount: Decimal) -> Result<Self, DomainError> {
        if amount.is_sign_negative() {
            return Err(DomainError::invalid("price", "must not be negative"));
        }
        if amount.scale() > FRACTION_DIGITS {
            return Err(DomainError::invalid("price", "at most two decimal places"));
        }
        amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|minor| minor.to_u64())
            .map(Money)
            .ok_or_else(|| DomainError::invalid("price", "amount too large"))
    }

    pub fn to_decimal(self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), FRACTION_DIGITS)
    }

    /// Parse a decimal string such as `"10"`, `"10.5"` or `"10.50"`.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let s = input.trim();
        let amount = Decimal::from_str_exact(s).map_err(|e| {
            DomainError::invalid("price", format!("not a decimal amount: {s:?} ({e})"))
        })?;
        Self::from_decimal(amount)
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.to_decimal(), f)
    }
}

impl FromStr for Money {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse(s)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::from_decimal(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.to_decimal()
    }
}

impl core::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Money::saturating_add)
    }
}
