//! `ExecutionPlan`: a thin, non-search-bearing view over an accepted
//! `PathResult`, exposing the linear sequence of steps a caller would
//! actually execute against the venues behind each leg.
//!
//! Multi-leg routing is linear by construction today (`PathFinder` never
//! emits branching or parallel paths, per §4.7), so `is_linear` is always
//! `true`. The accessor still exists, rather than assuming linearity at
//! every call site, because a future split-route mode (see the open
//! question in `DESIGN.md`) would only need to change this module.

use crate::materialize::PathLeg;
use crate::money::{Currency, Money};
use crate::service::PathResult;
use std::collections::BTreeMap;

/// One executable step: convert `spent` of `from` into `received` of `to`,
/// paying `fees` along the way.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ExecutionStep {
    pub from: Currency,
    pub to: Currency,
    pub spent: Money,
    pub received: Money,
    pub fees: BTreeMap<String, Money>,
}

impl From<&PathLeg> for ExecutionStep {
    fn from(leg: &PathLeg) -> Self {
        ExecutionStep {
            from: leg.from.clone(),
            to: leg.to.clone(),
            spent: leg.spent.clone(),
            received: leg.received.clone(),
            fees: leg.fees.clone(),
        }
    }
}

/// A caller-facing rendering of an accepted `PathResult` as an ordered
/// sequence of steps, plus its aggregate totals and fee breakdown.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ExecutionPlan {
    steps: Vec<ExecutionStep>,
    total_spent: Money,
    total_received: Money,
    fee_breakdown: BTreeMap<String, Money>,
}

impl ExecutionPlan {
    pub fn from_path_result(result: &PathResult) -> Self {
        ExecutionPlan {
            steps: result.legs.iter().map(ExecutionStep::from).collect(),
            total_spent: result.total_spent.clone(),
            total_received: result.total_received.clone(),
            fee_breakdown: result.fee_breakdown.clone(),
        }
    }

    /// `true` iff this plan is a single, strictly sequential chain of
    /// steps — the only shape `PathSearchService` currently produces.
    pub fn is_linear(&self) -> bool {
        true
    }

    /// The plan's steps in execution order, when linear (always, today).
    pub fn as_linear_path(&self) -> Option<&[ExecutionStep]> {
        if self.is_linear() {
            Some(&self.steps)
        } else {
            None
        }
    }

    pub fn total_spent(&self) -> &Money {
        &self.total_spent
    }

    pub fn total_received(&self) -> &Money {
        &self.total_received
    }

    pub fn fee_breakdown(&self) -> &BTreeMap<String, Money> {
        &self.fee_breakdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Decimal;

    fn money(code: &str, amount: &str, scale: u32) -> Money {
        Money::new(Currency::new(code).unwrap(), Decimal::parse(amount, scale).unwrap()).unwrap()
    }

    fn sample_result() -> PathResult {
        let leg = PathLeg {
            from: Currency::new("USD").unwrap(),
            to: Currency::new("EUR").unwrap(),
            spent: money("USD", "100", 2),
            received: money("EUR", "90", 2),
            fees: BTreeMap::new(),
        };
        PathResult {
            total_spent: money("USD", "100", 2),
            total_received: money("EUR", "90", 2),
            residual_tolerance: Decimal::zero(),
            legs: vec![leg],
            fee_breakdown: BTreeMap::new(),
        }
    }

    #[test]
    fn renders_legs_as_linear_steps() {
        let plan = ExecutionPlan::from_path_result(&sample_result());
        assert!(plan.is_linear());
        let steps = plan.as_linear_path().unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].from, Currency::new("USD").unwrap());
        assert_eq!(steps[0].to, Currency::new("EUR").unwrap());
    }

    #[test]
    fn carries_aggregate_totals() {
        let plan = ExecutionPlan::from_path_result(&sample_result());
        assert_eq!(plan.total_spent().amount().to_canonical_string(), "100.00");
        assert_eq!(plan.total_received().amount().to_canonical_string(), "90.00");
    }
}
