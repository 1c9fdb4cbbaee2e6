#![deny(clippy::unreadable_literal)]

mod bounds;
mod decimal;
mod error;
mod execution_plan;
mod fee;
mod fill;
mod graph;
mod guards;
mod materialize;
mod money;
mod order;
mod order_strategy;
mod rate;
mod search;
mod service;
mod spend;
mod tolerance;
mod tolerance_eval;

pub use self::bounds::OrderBounds;
pub use self::decimal::{Decimal, DecimalMath};
pub use self::error::CoreError;
pub use self::execution_plan::{ExecutionPlan, ExecutionStep};
pub use self::fee::{FeeBreakdown, FeePolicy, NoFee, ProportionalFee};
pub use self::fill::{FillEvaluator, FillOutcome};
pub use self::graph::{Capacity, Edge, Graph, GraphBuilder, Node, Segment, CANONICAL_SCALE};
pub use self::guards::{
    Clock, GuardBreaches, GuardLimits, GuardMetrics, SearchGuardConfig, SearchGuardReport, SearchGuards, SystemClock,
};
pub use self::materialize::{LegMaterializer, MaterializedPath, PathLeg};
pub use self::money::{Currency, Money};
pub use self::order::{
    AllowAll, AndFilter, ByBoundsOverlap, ByCurrencyRelevance, ByMinOrderSize, Order, OrderBook, OrderFilter, OrderSide,
};
pub use self::order_strategy::{CanonicalOrderStrategy, OrderingContext, PathOrderStrategy};
pub use self::rate::{AssetPair, ExchangeRate};
pub use self::search::{AcceptAll, Acceptor, CandidatePath, PathFinder, PathFinderConfig};
pub use self::service::{PathResult, PathResultSet, PathSearchConfig, PathSearchService, SearchOutcome};
pub use self::spend::{SpendConstraints, SpendRange};
pub use self::tolerance::ToleranceWindow;
pub use self::tolerance_eval::ToleranceEvaluator;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn currency(code: &str) -> Currency {
        Currency::new(code).unwrap()
    }

    fn money(code: &str, amount: &str, scale: u32) -> Money {
        Money::new(currency(code), Decimal::parse(amount, scale).unwrap()).unwrap()
    }

    /// End-to-end smoke test wiring every module together the way a caller
    /// would: build an order book, configure a search, and read back a
    /// materialized, fee-aware `PathResult`.
    #[test]
    fn routes_a_fee_bearing_two_hop_conversion() {
        let usd_eur = Order::new(
            OrderSide::Buy,
            AssetPair::new(currency("USD"), currency("EUR")).unwrap(),
            OrderBounds::new(money("USD", "1", 2), money("USD", "1000", 2)).unwrap(),
            ExchangeRate::new(currency("USD"), currency("EUR"), Decimal::parse("0.9", 6).unwrap()).unwrap(),
            Some(Arc::new(ProportionalFee::new(Decimal::parse("0.01", 4).unwrap()).unwrap())),
        )
        .unwrap();
        let eur_gbp = Order::new(
            OrderSide::Buy,
            AssetPair::new(currency("EUR"), currency("GBP")).unwrap(),
            OrderBounds::new(money("EUR", "1", 2), money("EUR", "1000", 2)).unwrap(),
            ExchangeRate::new(currency("EUR"), currency("GBP"), Decimal::parse("0.85", 6).unwrap()).unwrap(),
            None,
        )
        .unwrap();
        let book = OrderBook::new(vec![usd_eur, eur_gbp]);

        let spend = SpendConstraints::new(money("USD", "10", 2), money("USD", "500", 2), Some(money("USD", "100", 2))).unwrap();
        let tolerance = ToleranceWindow::new(Decimal::parse("0.02", 18).unwrap(), Decimal::parse("0.02", 18).unwrap()).unwrap();
        let guard_config = SearchGuardConfig::new(Some(1_000), Some(1_000), None, false).unwrap();
        let config = PathSearchConfig::new(spend, tolerance, 1, 3, 3, guard_config, None).unwrap();

        let outcome = PathSearchService.search(&book, "usd", "gbp", &config, None).unwrap();
        assert_eq!(outcome.paths.len(), 1);
        let result = &outcome.paths.paths()[0];
        assert_eq!(result.total_received.currency(), &currency("GBP"));
        assert_eq!(result.legs.len(), 2);

        let plan = ExecutionPlan::from_path_result(result);
        assert!(plan.is_linear());
        assert_eq!(plan.as_linear_path().unwrap().len(), 2);
    }
}
