//! `Money` and currency-code validation.
//!
//! Mirrors the teacher's pattern of small, invariant-checked value types
//! (`scalar::Price`/`ExchangeRate`) but carries an explicit currency code and
//! scale instead of an implicit token ID, since this system's assets are not
//! drawn from a fixed, pre-indexed token list.

use crate::decimal::{Decimal, DecimalMath};
use crate::error::CoreError;
use std::cmp::Ordering;
use std::fmt;

/// A validated currency code: 3-12 uppercase ASCII letters.
#[derive(Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl Into<String>) -> Result<Self, CoreError> {
        let code = code.into();
        let valid_len = (3..=12).contains(&code.len());
        let valid_chars = code.chars().all(|c| c.is_ascii_uppercase());
        if !valid_len || !valid_chars {
            return Err(CoreError::invalid_input(format!(
                "invalid currency code {:?}: must be 3-12 uppercase letters",
                code
            )));
        }
        Ok(Currency(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A non-negative amount of a specific currency at a fixed scale.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Money {
    currency: Currency,
    amount: Decimal,
    scale: u32,
}

impl Money {
    pub fn new(currency: Currency, amount: Decimal) -> Result<Self, CoreError> {
        if amount.is_negative() {
            return Err(CoreError::invalid_input(format!(
                "money amount must be non-negative, got {}",
                amount
            )));
        }
        let scale = amount.scale();
        Ok(Money {
            currency,
            amount,
            scale,
        })
    }

    pub fn zero(currency: Currency, scale: u32) -> Result<Self, CoreError> {
        let amount = DecimalMath::normalize(&Decimal::zero(), scale)?;
        Money::new(currency, amount)
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn amount(&self) -> &Decimal {
        &self.amount
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Rescales this amount to `scale`, rounding HALF_UP.
    pub fn with_scale(&self, scale: u32) -> Result<Self, CoreError> {
        let amount = DecimalMath::normalize(&self.amount, scale)?;
        Money::new(self.currency.clone(), amount)
    }

    fn require_same_currency(&self, other: &Money) -> Result<(), CoreError> {
        if self.currency != other.currency {
            return Err(CoreError::invalid_input(format!(
                "currency mismatch: {} vs {}",
                self.currency, other.currency
            )));
        }
        Ok(())
    }

    /// Adds two `Money` values of the same currency. Result scale defaults
    /// to `max(lhs.scale, rhs.scale)` unless `scale` is given.
    pub fn add(&self, other: &Money, scale: Option<u32>) -> Result<Money, CoreError> {
        self.require_same_currency(other)?;
        let scale = scale.unwrap_or_else(|| self.scale.max(other.scale));
        let amount = DecimalMath::add(&self.amount, &other.amount, scale)?;
        Money::new(self.currency.clone(), amount)
    }

    pub fn sub(&self, other: &Money, scale: Option<u32>) -> Result<Money, CoreError> {
        self.require_same_currency(other)?;
        let scale = scale.unwrap_or_else(|| self.scale.max(other.scale));
        let amount = DecimalMath::sub(&self.amount, &other.amount, scale)?;
        Money::new(self.currency.clone(), amount)
    }

    /// Multiplies by a scalar `Decimal`, preserving the left scale unless
    /// `scale` is given.
    pub fn mul_scalar(&self, scalar: &Decimal, scale: Option<u32>) -> Result<Money, CoreError> {
        let scale = scale.unwrap_or(self.scale);
        let amount = DecimalMath::mul(&self.amount, scalar, scale)?;
        Money::new(self.currency.clone(), amount)
    }

    /// Divides by a scalar `Decimal`, preserving the left scale unless
    /// `scale` is given. Division by zero is a fault (`CoreError::InvalidInput`).
    pub fn div_scalar(&self, scalar: &Decimal, scale: Option<u32>) -> Result<Money, CoreError> {
        let scale = scale.unwrap_or(self.scale);
        let amount = DecimalMath::div(&self.amount, scalar, scale)?;
        Money::new(self.currency.clone(), amount)
    }

    /// Compares two same-currency amounts at `scale` (defaults to the
    /// larger of the two native scales).
    pub fn compare(&self, other: &Money, scale: Option<u32>) -> Result<Ordering, CoreError> {
        self.require_same_currency(other)?;
        let scale = scale.unwrap_or_else(|| self.scale.max(other.scale));
        DecimalMath::comp(&self.amount, &other.amount, scale)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount.to_canonical_string(), self.currency)
    }
}
