//! `FillEvaluator`: resolves the net/gross base, quote, and fees for a fill
//! of a given base amount against an order (§4.2).

use crate::error::CoreError;
use crate::fee::FeeBreakdown;
use crate::money::Money;
use crate::order::{Order, OrderSide};

/// The result of evaluating a fill of `gross_base` against an order.
#[derive(Clone, Debug)]
pub struct FillOutcome {
    /// The base amount actually delivered to (BUY) or taken from (SELL) the
    /// taker after base-side fees.
    pub net_base: Money,
    /// The base amount the fill is sized against, before any base-side fee.
    pub gross_base: Money,
    /// The quote amount after applying the sign convention in
    /// `fee::FeeBreakdown`'s documentation.
    pub quote: Money,
    pub fees: FeeBreakdown,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct FillEvaluator;

impl FillEvaluator {
    /// Evaluates a fill of `base_amount` against `order`. Callers are
    /// expected to have already checked `order.bounds().contains(base_amount)`;
    /// this function does not re-check it, since it is also used to probe
    /// amounts during the SELL-with-fees fixed-point reconciliation (§4.8)
    /// before the candidate amount is known to be in bounds.
    pub fn evaluate(order: &Order, base_amount: &Money) -> Result<FillOutcome, CoreError> {
        let raw_quote = order.rate().convert(base_amount, None)?;

        let fees = match order.fee_policy() {
            Some(policy) => policy.calculate(order.side(), base_amount, &raw_quote)?,
            None => FeeBreakdown::none(),
        };

        let net_base = match &fees.base_fee {
            Some(fee) => base_amount.sub(fee, None)?,
            None => base_amount.clone(),
        };

        let quote = match (order.side(), &fees.quote_fee) {
            (_, None) => raw_quote,
            (OrderSide::Buy, Some(fee)) => raw_quote.add(fee, None)?,
            (OrderSide::Sell, Some(fee)) => raw_quote.sub(fee, None)?,
        };

        Ok(FillOutcome {
            net_base,
            gross_base: base_amount.clone(),
            quote,
            fees,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::OrderBounds;
    use crate::decimal::Decimal;
    use crate::fee::ProportionalFee;
    use crate::money::Currency;
    use crate::rate::{AssetPair, ExchangeRate};
    use std::sync::Arc;

    fn order_with_fee(rate_value: &str, fee_rate: &str) -> Order {
        let pair = AssetPair::new(Currency::new("USD").unwrap(), Currency::new("EUR").unwrap())
            .unwrap();
        let bounds = OrderBounds::new(
            Money::new(Currency::new("USD").unwrap(), Decimal::parse("1", 2).unwrap()).unwrap(),
            Money::new(Currency::new("USD").unwrap(), Decimal::parse("1000", 2).unwrap()).unwrap(),
        )
        .unwrap();
        let rate = ExchangeRate::new(
            Currency::new("USD").unwrap(),
            Currency::new("EUR").unwrap(),
            Decimal::parse(rate_value, 6).unwrap(),
        )
        .unwrap();
        let fee = Arc::new(ProportionalFee::new(Decimal::parse(fee_rate, 4).unwrap()).unwrap());
        Order::new(OrderSide::Buy, pair, bounds, rate, Some(fee)).unwrap()
    }

    #[test]
    fn buy_adds_quote_fee_as_a_surcharge() {
        let order = order_with_fee("0.900000", "0.01");
        let base = Money::new(Currency::new("USD").unwrap(), Decimal::parse("100", 2).unwrap())
            .unwrap();
        let outcome = FillEvaluator::evaluate(&order, &base).unwrap();
        // raw_quote = 90.00 EUR, fee = 0.90 EUR, taker pays 90.90 EUR equivalent spend.
        assert_eq!(outcome.quote.amount().to_canonical_string(), "90.900000");
        assert_eq!(outcome.net_base.amount().to_canonical_string(), "100.00");
    }

    #[test]
    fn no_fee_leaves_amounts_unchanged() {
        let pair = AssetPair::new(Currency::new("USD").unwrap(), Currency::new("EUR").unwrap())
            .unwrap();
        let bounds = OrderBounds::new(
            Money::new(Currency::new("USD").unwrap(), Decimal::parse("1", 2).unwrap()).unwrap(),
            Money::new(Currency::new("USD").unwrap(), Decimal::parse("1000", 2).unwrap()).unwrap(),
        )
        .unwrap();
        let rate = ExchangeRate::new(
            Currency::new("USD").unwrap(),
            Currency::new("EUR").unwrap(),
            Decimal::parse("0.9", 4).unwrap(),
        )
        .unwrap();
        let order = Order::new(OrderSide::Buy, pair, bounds, rate, None).unwrap();
        let base = Money::new(Currency::new("USD").unwrap(), Decimal::parse("100", 2).unwrap())
            .unwrap();
        let outcome = FillEvaluator::evaluate(&order, &base).unwrap();
        assert!(outcome.fees.is_none());
        assert_eq!(outcome.net_base.amount().to_canonical_string(), "100.00");
    }
}
