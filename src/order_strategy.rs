//! `PathOrderStrategy`: the pluggable comparator seam behind the frontier's
//! canonical ordering (§4.7.3, `SPEC_FULL.md` §10). The default strategy
//! implements the canonical comparator exactly; callers may substitute
//! their own to re-rank candidates while keeping dominance pruning,
//! tolerance ceiling, and FIFO tie-breaking unchanged.

use crate::decimal::{Decimal, DecimalMath};
use crate::graph::CANONICAL_SCALE;
use std::cmp::Ordering;
use std::fmt;

/// A read-only view of one queue entry's ordering inputs, passed to
/// `PathOrderStrategy::compare` without exposing the entry's internals.
#[derive(Clone, Copy, Debug)]
pub struct OrderingContext<'a> {
    pub cost: &'a Decimal,
    pub hops: usize,
    pub route_signature: &'a str,
    pub insertion_order: u64,
}

/// A total-order comparator over two frontier/Top-K entries.
pub trait PathOrderStrategy: fmt::Debug {
    fn compare(&self, a: OrderingContext<'_>, b: OrderingContext<'_>) -> Ordering;
}

/// `(cost ASC, hops ASC, routeSignature ASC, insertionOrder ASC)` (§4.7.3).
#[derive(Clone, Copy, Debug, Default)]
pub struct CanonicalOrderStrategy;

impl PathOrderStrategy for CanonicalOrderStrategy {
    fn compare(&self, a: OrderingContext<'_>, b: OrderingContext<'_>) -> Ordering {
        DecimalMath::comp(a.cost, b.cost, CANONICAL_SCALE)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.hops.cmp(&b.hops))
            .then_with(|| a.route_signature.cmp(b.route_signature))
            .then_with(|| a.insertion_order.cmp(&b.insertion_order))
    }
}
