//! `AssetPair` and `ExchangeRate`.
//!
//! The teacher's `scalar::ExchangeRate` is an `f64` newtype with a `weight()`
//! method feeding `petgraph`'s Bellman-Ford edge weights. This crate's
//! `ExchangeRate` carries an exact `Decimal` instead, since rates here must
//! convert exactly at caller-chosen scales rather than merely compare.

use crate::decimal::{Decimal, DecimalMath};
use crate::error::CoreError;
use crate::money::{Currency, Money};

/// An ordered pair of distinct currencies: `base` is converted into `quote`.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize)]
pub struct AssetPair {
    base: Currency,
    quote: Currency,
}

impl AssetPair {
    pub fn new(base: Currency, quote: Currency) -> Result<Self, CoreError> {
        if base.as_str().eq_ignore_ascii_case(quote.as_str()) {
            return Err(CoreError::invalid_input(format!(
                "asset pair base and quote must differ, got {} / {}",
                base, quote
            )));
        }
        Ok(AssetPair { base, quote })
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    pub fn quote(&self) -> &Currency {
        &self.quote
    }

    pub fn inverse(&self) -> Self {
        AssetPair {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }
}

/// A strictly-positive exchange rate converting `base` amounts into `quote`
/// amounts: `quote_amount = base_amount * rate`.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ExchangeRate {
    base: Currency,
    quote: Currency,
    rate: Decimal,
    scale: u32,
}

impl ExchangeRate {
    pub fn new(base: Currency, quote: Currency, rate: Decimal) -> Result<Self, CoreError> {
        if base.as_str().eq_ignore_ascii_case(quote.as_str()) {
            return Err(CoreError::invalid_input(
                "exchange rate base and quote must differ",
            ));
        }
        if !rate.is_positive() {
            return Err(CoreError::invalid_input(format!(
                "exchange rate must be strictly positive, got {}",
                rate
            )));
        }
        let scale = rate.scale();
        Ok(ExchangeRate {
            base,
            quote,
            rate,
            scale,
        })
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    pub fn quote(&self) -> &Currency {
        &self.quote
    }

    pub fn rate(&self) -> &Decimal {
        &self.rate
    }

    /// Converts `amount` (must be in `base`) into `quote` at `scale`
    /// (defaults to this rate's own scale).
    pub fn convert(&self, amount: &Money, scale: Option<u32>) -> Result<Money, CoreError> {
        if amount.currency() != &self.base {
            return Err(CoreError::invalid_input(format!(
                "cannot convert {} with a {}/{} rate",
                amount.currency(),
                self.base,
                self.quote
            )));
        }
        let scale = scale.unwrap_or(self.scale);
        let converted = DecimalMath::mul(amount.amount(), &self.rate, scale)?;
        Money::new(self.quote.clone(), converted)
    }

    /// Produces the reciprocal rate at the same scale. Precision loss from
    /// this rounding is expected and documented: `rate.invert().invert()`
    /// is epsilon-stable, not exact (§3, I10).
    pub fn invert(&self) -> Result<Self, CoreError> {
        let reciprocal = DecimalMath::div(&Decimal::one(), &self.rate, self.scale)?;
        ExchangeRate::new(self.quote.clone(), self.base.clone(), reciprocal)
    }

    pub fn pair(&self) -> Result<AssetPair, CoreError> {
        AssetPair::new(self.base.clone(), self.quote.clone())
    }
}
