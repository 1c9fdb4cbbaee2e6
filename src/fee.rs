//! Fee policies and their resulting breakdowns.
//!
//! The teacher bakes a single hardcoded `FEE_FACTOR` constant into every
//! price (`lib.rs`, `scalar.rs`). This system needs per-order, swappable fee
//! behavior, so fees become a capability (`FeePolicy`) with a stable
//! fingerprint instead of a crate-wide constant — the fingerprint is what
//! lets `GraphBuilder` key dominance/canonical-ordering signatures on "which
//! fee behavior applies" without comparing closures.

use crate::decimal::{Decimal, DecimalMath};
use crate::error::CoreError;
use crate::money::Money;
use crate::order::OrderSide;
use std::fmt;

/// The fee(s) charged for a fill, expressed as `Money` in the currency they
/// annotate.
///
/// Sign convention (§9 Open Questions, resolved narrowly): `base_fee` is
/// always subtracted from the base amount the taker receives or delivers.
/// `quote_fee` is added to the quote amount a BUY taker spends, and
/// subtracted from the quote amount a SELL taker receives — i.e. both fees
/// always make the trade strictly worse for the taker, regardless of side.
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct FeeBreakdown {
    pub base_fee: Option<Money>,
    pub quote_fee: Option<Money>,
}

impl FeeBreakdown {
    pub fn none() -> Self {
        FeeBreakdown::default()
    }

    pub fn for_base(fee: Money) -> Self {
        FeeBreakdown {
            base_fee: Some(fee),
            quote_fee: None,
        }
    }

    pub fn for_quote(fee: Money) -> Self {
        FeeBreakdown {
            base_fee: None,
            quote_fee: Some(fee),
        }
    }

    pub fn both(base_fee: Money, quote_fee: Money) -> Self {
        FeeBreakdown {
            base_fee: Some(base_fee),
            quote_fee: Some(quote_fee),
        }
    }

    pub fn is_none(&self) -> bool {
        self.base_fee.is_none() && self.quote_fee.is_none()
    }
}

/// A pure function from `(side, base_amount, quote_amount)` to a
/// `FeeBreakdown`, plus a stable fingerprint identifying the policy's
/// observable behavior. Implementations must be side-effect-free: the
/// search core treats `FeePolicy` instances as shared, read-only data.
pub trait FeePolicy: fmt::Debug {
    fn calculate(
        &self,
        side: OrderSide,
        base_amount: &Money,
        quote_amount: &Money,
    ) -> Result<FeeBreakdown, CoreError>;

    /// A non-empty string uniquely identifying this policy's observable
    /// behavior. Two policies with the same fingerprint must behave
    /// identically for every input; this is enforced at `GraphBuilder` time
    /// (empty fingerprints are rejected).
    fn fingerprint(&self) -> String;
}

/// The default policy: no fees of any kind.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFee;

impl FeePolicy for NoFee {
    fn calculate(
        &self,
        _side: OrderSide,
        _base_amount: &Money,
        _quote_amount: &Money,
    ) -> Result<FeeBreakdown, CoreError> {
        Ok(FeeBreakdown::none())
    }

    fn fingerprint(&self) -> String {
        "none".to_string()
    }
}

/// A fixed proportional fee on the quote side, e.g. the exchange's
/// `FEE_FACTOR` in the teacher crate generalized from a hardcoded constant
/// to a configurable, fingerprinted rate (`SPEC_FULL.md` §10).
#[derive(Clone, Debug)]
pub struct ProportionalFee {
    /// Fee rate in `[0, 1)`, e.g. `0.003` for 30 basis points.
    rate: Decimal,
}

impl ProportionalFee {
    pub fn new(rate: Decimal) -> Result<Self, CoreError> {
        let zero = Decimal::zero();
        let one = Decimal::one();
        let scale = rate.scale().max(1);
        if DecimalMath::comp(&rate, &zero, scale)? == std::cmp::Ordering::Less
            || DecimalMath::comp(&rate, &one, scale)? != std::cmp::Ordering::Less
        {
            return Err(CoreError::invalid_input(format!(
                "proportional fee rate must be in [0, 1), got {}",
                rate
            )));
        }
        Ok(ProportionalFee { rate })
    }
}

impl FeePolicy for ProportionalFee {
    fn calculate(
        &self,
        _side: OrderSide,
        _base_amount: &Money,
        quote_amount: &Money,
    ) -> Result<FeeBreakdown, CoreError> {
        if self.rate.is_zero() {
            return Ok(FeeBreakdown::none());
        }
        let scale = quote_amount.scale();
        let fee_amount = DecimalMath::mul(quote_amount.amount(), &self.rate, scale)?;
        let fee = Money::new(quote_amount.currency().clone(), fee_amount)?;
        Ok(FeeBreakdown::for_quote(fee))
    }

    fn fingerprint(&self) -> String {
        format!("proportional:{}", self.rate.to_canonical_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn money(currency: &str, amount: &str, scale: u32) -> Money {
        Money::new(
            Currency::new(currency).unwrap(),
            Decimal::parse(amount, scale).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn no_fee_is_always_empty() {
        let fee = NoFee.calculate(
            OrderSide::Buy,
            &money("USD", "100", 2),
            &money("EUR", "90", 2),
        );
        assert!(fee.unwrap().is_none());
        assert_eq!(NoFee.fingerprint(), "none");
    }

    #[test]
    fn proportional_fee_charges_the_quote_side() {
        let policy = ProportionalFee::new(Decimal::parse("0.01", 4).unwrap()).unwrap();
        let breakdown = policy
            .calculate(
                OrderSide::Buy,
                &money("USD", "100", 2),
                &money("EUR", "90.00", 2),
            )
            .unwrap();
        assert!(breakdown.base_fee.is_none());
        let quote_fee = breakdown.quote_fee.unwrap();
        assert_eq!(quote_fee.amount().to_canonical_string(), "0.90");
        assert!(!policy.fingerprint().is_empty());
    }

    #[test]
    fn rejects_out_of_range_rate() {
        assert!(ProportionalFee::new(Decimal::parse("1", 2).unwrap()).is_err());
        assert!(ProportionalFee::new(Decimal::parse("-0.1", 2).unwrap()).is_err());
    }
}
