//! Graph construction from an `OrderBook` (§3, §4.3).
//!
//! The teacher models the orderbook as a `petgraph::DiGraph<TokenId, Weight>`
//! keyed by small contiguous `TokenId`s (`orderbook.rs`). Here the key space
//! is an open set of currency codes rather than a pre-indexed token list, and
//! every origin node needs its *own* sorted edge list (for the canonical
//! frontier order in §4.7.3) rather than a single cheapest-edge-per-pair
//! projection, so the graph is kept as a plain currency-keyed adjacency map
//! instead of a `petgraph` graph — there is no shortest-path algorithm from
//! `petgraph::algo` this crate calls into (`PathFinder` is a custom
//! best-first search, not Bellman-Ford); see `DESIGN.md` for the dependency
//! drop this implies.

use crate::bounds::OrderBounds;
use crate::decimal::{Decimal, DecimalMath};
use crate::error::CoreError;
use crate::fill::FillEvaluator;
use crate::money::{Currency, Money};
use crate::order::{Order, OrderBook, OrderFilter, OrderSide};
use std::cmp::Ordering;
use std::collections::HashMap;

/// The canonical scale used for cost, product, tolerance, and conversion
/// values (§3).
pub const CANONICAL_SCALE: u32 = 18;

/// A `[min, max]` capacity range in one currency; reuses `OrderBounds`'
/// shape since a capacity triple has identical invariants to an order's
/// fill bounds.
pub type Capacity = OrderBounds;

/// One slice of an edge's fill range (§3).
#[derive(Clone, Debug)]
pub struct Segment {
    pub is_mandatory: bool,
    pub base: Money,
    pub quote: Money,
    pub gross_base: Money,
}

/// A directed, fee-aware edge derived from a single order (§3).
#[derive(Clone, Debug)]
pub struct Edge {
    from: Currency,
    to: Currency,
    order_side: OrderSide,
    order: Order,
    base_capacity: Capacity,
    quote_capacity: Capacity,
    gross_base_capacity: Capacity,
    segments: Vec<Segment>,
    effective_conversion_rate: Decimal,
}

impl Edge {
    pub fn from(&self) -> &Currency {
        &self.from
    }

    pub fn to(&self) -> &Currency {
        &self.to
    }

    pub fn order_side(&self) -> OrderSide {
        self.order_side
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn base_capacity(&self) -> &Capacity {
        &self.base_capacity
    }

    pub fn quote_capacity(&self) -> &Capacity {
        &self.quote_capacity
    }

    pub fn gross_base_capacity(&self) -> &Capacity {
        &self.gross_base_capacity
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn effective_conversion_rate(&self) -> &Decimal {
        &self.effective_conversion_rate
    }

    /// The edge's source-side capacity bound: gross base for BUY, quote for
    /// SELL (§4.7.7).
    pub fn source_capacity(&self) -> &Capacity {
        match self.order_side {
            OrderSide::Buy => &self.gross_base_capacity,
            OrderSide::Sell => &self.quote_capacity,
        }
    }

    /// The edge's destination-side capacity bound: quote for BUY, (net)
    /// base for SELL.
    pub fn destination_capacity(&self) -> &Capacity {
        match self.order_side {
            OrderSide::Buy => &self.quote_capacity,
            OrderSide::Sell => &self.base_capacity,
        }
    }

    fn canonical_key(&self) -> (&str, String, &'static str) {
        (
            self.to.as_str(),
            self.order.fee_fingerprint(),
            match self.order_side {
                OrderSide::Buy => "BUY",
                OrderSide::Sell => "SELL",
            },
        )
    }

    fn cmp_canonical(&self, other: &Edge) -> Ordering {
        self.canonical_key().cmp(&other.canonical_key())
    }
}

/// A node in the graph: a currency and its outgoing edges, sorted by the
/// canonical comparator (destination, then fee fingerprint, then side).
#[derive(Clone, Debug)]
pub struct Node {
    currency: Currency,
    edges: Vec<Edge>,
}

impl Node {
    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }
}

/// An immutable, currency-keyed directed multigraph built once per search
/// from a snapshot of an `OrderBook` (§3).
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: HashMap<String, Node>,
}

impl Graph {
    pub fn node(&self, currency: &Currency) -> Option<&Node> {
        self.nodes.get(currency.as_str())
    }

    pub fn contains(&self, currency: &Currency) -> bool {
        self.nodes.contains_key(currency.as_str())
    }

    pub fn edges_from<'a>(&'a self, currency: &Currency) -> &'a [Edge] {
        self.nodes
            .get(currency.as_str())
            .map(|node| node.edges.as_slice())
            .unwrap_or(&[])
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.nodes.values().map(|node| node.edges.len()).sum()
    }
}

/// Builds an immutable `Graph` from an order collection (§4.3).
#[derive(Clone, Copy, Debug, Default)]
pub struct GraphBuilder;

impl GraphBuilder {
    pub fn build<'a>(orders: impl IntoIterator<Item = &'a Order>) -> Result<Graph, CoreError> {
        let mut nodes: HashMap<String, Node> = HashMap::new();

        for order in orders {
            let edge = build_edge(order)?;
            let entry = nodes.entry(edge.from.as_str().to_string()).or_insert_with(|| Node {
                currency: edge.from.clone(),
                edges: Vec::new(),
            });
            entry.edges.push(edge.clone());
            nodes
                .entry(edge.to.as_str().to_string())
                .or_insert_with(|| Node {
                    currency: edge.to.clone(),
                    edges: Vec::new(),
                });
        }

        for node in nodes.values_mut() {
            node.edges.sort_by(Edge::cmp_canonical);
        }

        Ok(Graph { nodes })
    }

    /// Builds a `Graph` from an `OrderBook`, applying `filter` first.
    pub fn build_filtered(book: &OrderBook, filter: &dyn OrderFilter) -> Result<Graph, CoreError> {
        GraphBuilder::build(book.filter(filter))
    }
}

fn build_edge(order: &Order) -> Result<Edge, CoreError> {
    if let Some(policy) = order.fee_policy() {
        if policy.fingerprint().is_empty() {
            return Err(CoreError::invalid_input(
                "fee policy fingerprint must not be empty",
            ));
        }
    }

    let (from, to) = match order.side() {
        OrderSide::Buy => (order.pair().base().clone(), order.pair().quote().clone()),
        OrderSide::Sell => (order.pair().quote().clone(), order.pair().base().clone()),
    };

    let min_outcome = FillEvaluator::evaluate(order, order.bounds().min())?;
    let max_outcome = FillEvaluator::evaluate(order, order.bounds().max())?;

    let base_capacity = Capacity::new(min_outcome.net_base.clone(), max_outcome.net_base.clone())?;
    let quote_capacity = Capacity::new(min_outcome.quote.clone(), max_outcome.quote.clone())?;
    let gross_base_capacity = Capacity::new(
        min_outcome.gross_base.clone(),
        max_outcome.gross_base.clone(),
    )?;

    let segments = if order.fee_policy().is_some() {
        build_segments(order, &min_outcome, &max_outcome)?
    } else {
        Vec::new()
    };

    let effective_conversion_rate = compute_effective_rate(order, &gross_base_capacity, &quote_capacity)?;

    Ok(Edge {
        from,
        to,
        order_side: order.side(),
        order: order.clone(),
        base_capacity,
        quote_capacity,
        gross_base_capacity,
        segments,
        effective_conversion_rate,
    })
}

fn build_segments(
    order: &Order,
    min_outcome: &crate::fill::FillOutcome,
    max_outcome: &crate::fill::FillOutcome,
) -> Result<Vec<Segment>, CoreError> {
    let bounds = order.bounds();
    let min_positive = !bounds.min().is_zero();
    let width_positive = bounds.max().compare(bounds.min(), None)? == Ordering::Greater;

    if !min_positive && !width_positive {
        let base_scale = min_outcome.net_base.scale();
        let quote_scale = min_outcome.quote.scale();
        let zero_base = Money::zero(min_outcome.net_base.currency().clone(), base_scale)?;
        let zero_quote = Money::zero(min_outcome.quote.currency().clone(), quote_scale)?;
        return Ok(vec![Segment {
            is_mandatory: false,
            base: zero_base.clone(),
            quote: zero_quote,
            gross_base: zero_base,
        }]);
    }

    let mut segments = Vec::new();
    if min_positive {
        segments.push(Segment {
            is_mandatory: true,
            base: min_outcome.net_base.clone(),
            quote: min_outcome.quote.clone(),
            gross_base: min_outcome.gross_base.clone(),
        });
    }
    if width_positive {
        segments.push(Segment {
            is_mandatory: false,
            base: max_outcome.net_base.sub(&min_outcome.net_base, None)?,
            quote: max_outcome.quote.sub(&min_outcome.quote, None)?,
            gross_base: max_outcome.gross_base.sub(&min_outcome.gross_base, None)?,
        });
    }
    Ok(segments)
}

fn compute_effective_rate(
    order: &Order,
    gross_base_capacity: &Capacity,
    quote_capacity: &Capacity,
) -> Result<Decimal, CoreError> {
    let numerator;
    let denominator;
    match order.side() {
        OrderSide::Buy => {
            numerator = quote_capacity.max().amount().clone();
            denominator = gross_base_capacity.max().amount().clone();
        }
        OrderSide::Sell => {
            numerator = gross_base_capacity.max().amount().clone();
            denominator = quote_capacity.max().amount().clone();
        }
    }
    if denominator.is_zero() || numerator.is_zero() {
        return Ok(Decimal::zero());
    }
    DecimalMath::div(&numerator, &denominator, CANONICAL_SCALE)
}
