//! Non-negative stock quantities.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// An exact, never-negative amount of stock (grams, millilitres, pieces...).
///
/// The unit is whatever the category uses; the ledger only does arithmetic.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Quantity(Decimal);

impl ValueObject for Quantity {}

impl Quantity {
    pub const ZERO: Quantity = Quantity(Decimal::ZERO);

    /// Build a quantity, rejecting negative values.
    pub fn new(value: Decimal) -> DomainResult<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(DomainError::invalid_argument(format!(
                "quantity cannot be negative (got {value})"
            )));
        }
        Ok(Self(value.normalize()))
    }

    /// Build a strictly positive quantity; `what` names the field in the error.
    pub fn positive(value: Decimal, what: &str) -> DomainResult<Self> {
        if value <= Decimal::ZERO {
            return Err(DomainError::invalid_argument(format!(
                "{what} must be greater than zero (got {value})"
            )));
        }
        Ok(Self(value.normalize()))
    }

    pub fn from_units(units: u32) -> Self {
        Self(Decimal::from(units))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// `self - amount`, floored at zero.
    pub fn saturating_sub(self, amount: Quantity) -> Quantity {
        Self::floor_at_zero(self.0.saturating_sub(amount.0))
    }

    /// `self - delta` clamped into `[0, cap]`. `delta` may be negative.
    pub fn apply_delta(self, delta: Decimal, cap: Quantity) -> Quantity {
        let next = Self::floor_at_zero(self.0.saturating_sub(delta));
        next.min(cap)
    }

    /// `self + amount`, capped at `cap`.
    pub fn add_capped(self, amount: Quantity, cap: Quantity) -> Quantity {
        Self(self.0.saturating_add(amount.0).normalize()).min(cap)
    }

    fn floor_at_zero(value: Decimal) -> Quantity {
        if value <= Decimal::ZERO {
            Self::ZERO
        } else {
            Self(value.normalize())
        }
    }
}

impl TryFrom<Decimal> for Quantity {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}
