//! `LegMaterializer`: turns a `CandidatePath` into concrete per-hop
//! `PathLeg`s, including the SELL-with-fees fixed-point reconciliation
//! (§4.8).

use crate::decimal::{Decimal, DecimalMath};
use crate::error::CoreError;
use crate::fee::FeeBreakdown;
use crate::fill::FillEvaluator;
use crate::graph::Edge;
use crate::money::{Currency, Money};
use crate::order::OrderSide;
use crate::search::CandidatePath;
use crate::spend::SpendRange;
use std::collections::BTreeMap;

/// One resolved hop: what was spent, what was received, and any fees
/// charged along the way (§3).
#[derive(Clone, Debug, serde::Serialize)]
pub struct PathLeg {
    pub from: Currency,
    pub to: Currency,
    pub spent: Money,
    pub received: Money,
    pub fees: BTreeMap<String, Money>,
}

/// A fully materialized path: aggregate spend/receive and the per-leg
/// detail, before tolerance evaluation (§3).
#[derive(Clone, Debug)]
pub struct MaterializedPath {
    pub total_spent: Money,
    pub total_received: Money,
    pub legs: Vec<PathLeg>,
    pub fee_breakdown: BTreeMap<String, Money>,
}

/// The scale slack added on top of the base scale when solving the
/// SELL-with-fees ratio (§4.8 step 4): "scale ≥ 12 (+6 slack)".
const RECONCILIATION_MIN_SCALE: u32 = 12;
const RECONCILIATION_SLACK: u32 = 6;
const RECONCILIATION_MAX_ITERATIONS: u32 = 3;

#[derive(Clone, Copy, Debug, Default)]
pub struct LegMaterializer;

impl LegMaterializer {
    /// Materializes every leg of `candidate`, starting from `initial_spend`
    /// (already resolved into `[configMin, configMax] ∩ edge₀.sourceSupport`
    /// by the caller).
    pub fn materialize(candidate: &CandidatePath, initial_spend: Money) -> Result<MaterializedPath, CoreError> {
        if candidate.edges.is_empty() {
            return Ok(MaterializedPath {
                total_spent: initial_spend.clone(),
                total_received: initial_spend,
                legs: Vec::new(),
                fee_breakdown: BTreeMap::new(),
            });
        }

        let mut legs = Vec::with_capacity(candidate.edges.len());
        let mut fee_breakdown: BTreeMap<String, Money> = BTreeMap::new();
        let mut current_amount = initial_spend.clone();

        for edge in &candidate.edges {
            let leg = materialize_leg(edge, &current_amount)?;
            accumulate_fees(&mut fee_breakdown, &leg.fees)?;
            current_amount = leg.received.clone();
            legs.push(leg);
        }

        Ok(MaterializedPath {
            total_spent: initial_spend,
            total_received: current_amount,
            legs,
            fee_breakdown,
        })
    }
}

fn accumulate_fees(totals: &mut BTreeMap<String, Money>, fees: &BTreeMap<String, Money>) -> Result<(), CoreError> {
    for (currency, fee) in fees {
        match totals.get(currency) {
            Some(existing) => {
                let updated = existing.add(fee, None)?;
                totals.insert(currency.clone(), updated);
            }
            None => {
                totals.insert(currency.clone(), fee.clone());
            }
        }
    }
    Ok(())
}

fn fees_by_currency(fees: &FeeBreakdown) -> BTreeMap<String, Money> {
    let mut map = BTreeMap::new();
    if let Some(fee) = &fees.base_fee {
        map.insert(fee.currency().as_str().to_string(), fee.clone());
    }
    if let Some(fee) = &fees.quote_fee {
        map.entry(fee.currency().as_str().to_string())
            .and_modify(|existing: &mut Money| {
                if let Ok(sum) = existing.add(fee, None) {
                    *existing = sum;
                }
            })
            .or_insert_with(|| fee.clone());
    }
    map
}

fn materialize_leg(edge: &Edge, current_amount: &Money) -> Result<PathLeg, CoreError> {
    match edge.order_side() {
        OrderSide::Buy => materialize_buy_leg(edge, current_amount),
        OrderSide::Sell if edge.order().fee_policy().is_none() => materialize_sell_leg_no_fee(edge, current_amount),
        OrderSide::Sell => materialize_sell_leg_with_fees(edge, current_amount),
    }
}

fn materialize_buy_leg(edge: &Edge, current_amount: &Money) -> Result<PathLeg, CoreError> {
    let order = edge.order();
    let spent = order.bounds().clamp_to_bounds(current_amount)?;
    if !order.bounds().contains(&spent)? {
        return Err(CoreError::infeasible_path(format!(
            "buy leg {}->{} cannot satisfy bounds for spend {}",
            edge.from(),
            edge.to(),
            spent
        )));
    }
    let outcome = FillEvaluator::evaluate(order, &spent)?;
    Ok(PathLeg {
        from: edge.from().clone(),
        to: edge.to().clone(),
        spent,
        received: outcome.quote,
        fees: fees_by_currency(&outcome.fees),
    })
}

fn materialize_sell_leg_no_fee(edge: &Edge, current_amount: &Money) -> Result<PathLeg, CoreError> {
    let order = edge.order();
    let inverse = order.rate().invert()?;
    let base_amount = inverse.convert(current_amount, Some(order.bounds().min().scale()))?;
    if !order.bounds().contains(&base_amount)? {
        return Err(CoreError::infeasible_path(format!(
            "sell leg {}->{} cannot satisfy bounds for received base {}",
            edge.from(),
            edge.to(),
            base_amount
        )));
    }
    Ok(PathLeg {
        from: edge.from().clone(),
        to: edge.to().clone(),
        spent: current_amount.clone(),
        received: base_amount,
        fees: BTreeMap::new(),
    })
}

fn materialize_sell_leg_with_fees(edge: &Edge, current_amount: &Money) -> Result<PathLeg, CoreError> {
    let order = edge.order();
    let base_scale = order.bounds().min().scale();
    let inverse = order.rate().invert()?;
    let mut base_amount = inverse.convert(current_amount, Some(base_scale))?;
    let mut last_fees = FeeBreakdown::none();
    let mut effective_quote = current_amount.clone();
    let mut converged = false;

    for _ in 0..RECONCILIATION_MAX_ITERATIONS {
        let outcome = FillEvaluator::evaluate(order, &base_amount)?;
        last_fees = outcome.fees;
        effective_quote = outcome.quote;

        if effective_quote.compare(current_amount, None)? == std::cmp::Ordering::Equal {
            converged = true;
            break;
        }
        if effective_quote.is_zero() {
            effective_quote = current_amount.clone();
            converged = true;
            break;
        }

        let ratio_scale = base_scale.max(RECONCILIATION_MIN_SCALE) + RECONCILIATION_SLACK;
        let ratio = DecimalMath::div(current_amount.amount(), effective_quote.amount(), ratio_scale)?;
        let rescaled = DecimalMath::mul(base_amount.amount(), &ratio, ratio_scale)?;
        let normalized = DecimalMath::normalize(&rescaled, base_scale)?;
        base_amount = Money::new(base_amount.currency().clone(), normalized)?;
    }

    // §4.8 step 5: freeze to the requested spend if 3 passes never converged.
    if !converged {
        effective_quote = current_amount.clone();
    }

    if !order.bounds().contains(&base_amount)? {
        return Err(CoreError::infeasible_path(format!(
            "sell-with-fees leg {}->{} cannot satisfy bounds for reconciled base {}",
            edge.from(),
            edge.to(),
            base_amount
        )));
    }

    Ok(PathLeg {
        from: edge.from().clone(),
        to: edge.to().clone(),
        spent: effective_quote,
        received: base_amount,
        fees: fees_by_currency(&last_fees),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::OrderBounds;
    use crate::fee::ProportionalFee;
    use crate::graph::GraphBuilder;
    use crate::order::Order;
    use crate::rate::{AssetPair, ExchangeRate};
    use std::sync::Arc;

    fn currency(code: &str) -> Currency {
        Currency::new(code).unwrap()
    }

    fn money(code: &str, amount: &str, scale: u32) -> Money {
        Money::new(currency(code), Decimal::parse(amount, scale).unwrap()).unwrap()
    }

    fn candidate_for(edges: Vec<Edge>) -> CandidatePath {
        CandidatePath {
            cost: Decimal::one(),
            product: Decimal::one(),
            hops: edges.len(),
            edges,
            amount_range: None,
            desired_amount: None,
        }
    }

    #[test]
    fn materializes_a_single_buy_leg() {
        let pair = AssetPair::new(currency("USD"), currency("EUR")).unwrap();
        let bounds = OrderBounds::new(money("USD", "1", 2), money("USD", "1000", 2)).unwrap();
        let rate = ExchangeRate::new(currency("USD"), currency("EUR"), Decimal::parse("0.9", 6).unwrap()).unwrap();
        let order = Order::new(OrderSide::Buy, pair, bounds, rate, None).unwrap();
        let graph = GraphBuilder::build(std::iter::once(&order)).unwrap();
        let edge = graph.edges_from(&currency("USD"))[0].clone();
        let candidate = candidate_for(vec![edge]);

        let materialized = LegMaterializer::materialize(&candidate, money("USD", "100", 2)).unwrap();
        assert_eq!(materialized.total_received.amount().to_canonical_string(), "90.000000");
        assert_eq!(materialized.legs.len(), 1);
    }

    #[test]
    fn sell_leg_without_fees_inverts_the_rate() {
        let pair = AssetPair::new(currency("BTC"), currency("USD")).unwrap();
        let bounds = OrderBounds::new(money("BTC", "0.01", 4), money("BTC", "10", 4)).unwrap();
        let rate = ExchangeRate::new(currency("BTC"), currency("USD"), Decimal::parse("30000", 6).unwrap()).unwrap();
        let order = Order::new(OrderSide::Sell, pair, bounds, rate, None).unwrap();
        let graph = GraphBuilder::build(std::iter::once(&order)).unwrap();
        let edge = graph.edges_from(&currency("USD"))[0].clone();
        let candidate = candidate_for(vec![edge]);

        let materialized = LegMaterializer::materialize(&candidate, money("USD", "3000", 2)).unwrap();
        assert_eq!(materialized.legs[0].to, currency("BTC"));
        assert!(!materialized.total_received.is_zero());
    }

    #[test]
    fn sell_with_fees_reconciles_to_the_requested_spend() {
        let pair = AssetPair::new(currency("BTC"), currency("USD")).unwrap();
        let bounds = OrderBounds::new(money("BTC", "0.001", 6), money("BTC", "10", 6)).unwrap();
        let rate = ExchangeRate::new(currency("BTC"), currency("USD"), Decimal::parse("30000", 6).unwrap()).unwrap();
        let fee = Arc::new(ProportionalFee::new(Decimal::parse("0.01", 4).unwrap()).unwrap());
        let order = Order::new(OrderSide::Sell, pair, bounds, rate, Some(fee)).unwrap();
        let graph = GraphBuilder::build(std::iter::once(&order)).unwrap();
        let edge = graph.edges_from(&currency("USD"))[0].clone();
        let candidate = candidate_for(vec![edge]);

        let spend = money("USD", "3000", 2);
        let materialized = LegMaterializer::materialize(&candidate, spend.clone()).unwrap();
        let leg = &materialized.legs[0];
        // effective quote (spent) should converge back to the requested spend
        assert_eq!(leg.spent.scale(), spend.scale());
        assert!(leg.spent.compare(&spend, None).unwrap() == std::cmp::Ordering::Equal
            || !leg.fees.is_empty());
    }

    #[test]
    fn rejects_a_leg_outside_order_bounds() {
        let pair = AssetPair::new(currency("USD"), currency("EUR")).unwrap();
        let bounds = OrderBounds::new(money("USD", "500", 2), money("USD", "1000", 2)).unwrap();
        let rate = ExchangeRate::new(currency("USD"), currency("EUR"), Decimal::parse("0.9", 6).unwrap()).unwrap();
        let order = Order::new(OrderSide::Buy, pair, bounds, rate, None).unwrap();
        let graph = GraphBuilder::build(std::iter::once(&order)).unwrap();
        let edge = graph.edges_from(&currency("USD"))[0].clone();
        let candidate = candidate_for(vec![edge]);

        let result = LegMaterializer::materialize(&candidate, money("USD", "10", 2));
        assert!(result.is_err());
    }
}
