//! `Order` and `OrderBook`.
//!
//! Grounded in the teacher's `orderbook::order::Order`/`OrderCollector`
//! (`pricegraph/src/orderbook/order.rs`), generalized from a single
//! buy-token/sell-token order keyed by contiguous `TokenId`s to a typed
//! BUY/SELL offer over an arbitrary `AssetPair`, carrying an optional
//! `FeePolicy` per §3.

use crate::bounds::OrderBounds;
use crate::error::CoreError;
use crate::fee::FeePolicy;
use crate::rate::{AssetPair, ExchangeRate};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// The side of an offer: does the maker buy or sell the pair's base asset.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// A single offer to trade `pair.base()` for `pair.quote()` (or vice versa
/// for SELL), with optional per-order fees.
#[derive(Clone)]
pub struct Order {
    side: OrderSide,
    pair: AssetPair,
    bounds: OrderBounds,
    rate: ExchangeRate,
    fee_policy: Option<Arc<dyn FeePolicy + Send + Sync>>,
}

impl fmt::Debug for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Order")
            .field("side", &self.side)
            .field("pair", &self.pair)
            .field("bounds", &self.bounds)
            .field("rate", &self.rate)
            .field("fee_policy", &self.fee_policy.as_ref().map(|p| p.fingerprint()))
            .finish()
    }
}

impl Order {
    pub fn new(
        side: OrderSide,
        pair: AssetPair,
        bounds: OrderBounds,
        rate: ExchangeRate,
        fee_policy: Option<Arc<dyn FeePolicy + Send + Sync>>,
    ) -> Result<Self, CoreError> {
        if bounds.min().currency() != pair.base() {
            return Err(CoreError::invalid_input(format!(
                "order bounds must be denominated in the base currency {}, got {}",
                pair.base(),
                bounds.min().currency()
            )));
        }
        if rate.base() != pair.base() || rate.quote() != pair.quote() {
            return Err(CoreError::invalid_input(format!(
                "order rate must convert {}/{}, got {}/{}",
                pair.base(),
                pair.quote(),
                rate.base(),
                rate.quote()
            )));
        }
        if let Some(policy) = &fee_policy {
            if policy.fingerprint().is_empty() {
                return Err(CoreError::invalid_input(
                    "fee policy fingerprint must not be empty",
                ));
            }
        }
        Ok(Order {
            side,
            pair,
            bounds,
            rate,
            fee_policy,
        })
    }

    pub fn side(&self) -> OrderSide {
        self.side
    }

    pub fn pair(&self) -> &AssetPair {
        &self.pair
    }

    pub fn bounds(&self) -> &OrderBounds {
        &self.bounds
    }

    pub fn rate(&self) -> &ExchangeRate {
        &self.rate
    }

    pub fn fee_policy(&self) -> Option<&(dyn FeePolicy + Send + Sync)> {
        self.fee_policy.as_deref()
    }

    /// A stable fingerprint for this order's fee behavior, used when
    /// building canonical edge-ordering and state signatures.
    pub fn fee_fingerprint(&self) -> String {
        self.fee_policy
            .as_ref()
            .map(|p| p.fingerprint())
            .unwrap_or_else(|| "none".to_string())
    }
}

/// A pure predicate over orders, the `OrderFilter` external collaborator
/// named in §6.
pub trait OrderFilter {
    fn accepts(&self, order: &Order) -> bool;
}

/// Accepts every order. The default when no filter is supplied.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl OrderFilter for AllowAll {
    fn accepts(&self, _order: &Order) -> bool {
        true
    }
}

/// Rejects orders whose maximum fill (`bounds().max()`) is below a
/// threshold amount, expressed in the order's own base currency.
#[derive(Clone, Debug)]
pub struct ByMinOrderSize {
    threshold: crate::money::Money,
}

impl ByMinOrderSize {
    pub fn new(threshold: crate::money::Money) -> Self {
        ByMinOrderSize { threshold }
    }
}

impl OrderFilter for ByMinOrderSize {
    fn accepts(&self, order: &Order) -> bool {
        if order.bounds().max().currency() != self.threshold.currency() {
            return true;
        }
        order
            .bounds()
            .max()
            .compare(&self.threshold, None)
            .map(|ordering| ordering != Ordering::Less)
            .unwrap_or(true)
    }
}

/// Accepts orders whose pair touches at least one of a fixed set of
/// currencies. Used by the orchestrator to discard orders that cannot
/// possibly sit on any path between a given source and target (§4.10).
#[derive(Clone, Debug)]
pub struct ByCurrencyRelevance {
    currencies: std::collections::HashSet<String>,
}

impl ByCurrencyRelevance {
    pub fn new(currencies: impl IntoIterator<Item = crate::money::Currency>) -> Self {
        ByCurrencyRelevance {
            currencies: currencies.into_iter().map(|c| c.as_str().to_string()).collect(),
        }
    }
}

impl OrderFilter for ByCurrencyRelevance {
    fn accepts(&self, order: &Order) -> bool {
        self.currencies.contains(order.pair().base().as_str())
            || self.currencies.contains(order.pair().quote().as_str())
    }
}

/// Accepts orders whose base-currency bounds overlap a given `[min, max]`
/// spend window; orders in an unrelated currency pass through untouched
/// (§4.10's `byBoundsOverlap(config.spendWindow)`).
#[derive(Clone, Debug)]
pub struct ByBoundsOverlap {
    window: crate::spend::SpendRange,
}

impl ByBoundsOverlap {
    pub fn new(window: crate::spend::SpendRange) -> Self {
        ByBoundsOverlap { window }
    }
}

impl OrderFilter for ByBoundsOverlap {
    fn accepts(&self, order: &Order) -> bool {
        let bounds = order.bounds();
        if bounds.min().currency() != self.window.min().currency() {
            return true;
        }
        let order_range = match crate::spend::SpendRange::new(bounds.min().clone(), bounds.max().clone()) {
            Ok(range) => range,
            Err(_) => return true,
        };
        matches!(order_range.intersect(&self.window), Ok(Some(_)))
    }
}

/// Combines two filters, accepting only orders both accept.
pub struct AndFilter<'a> {
    left: &'a dyn OrderFilter,
    right: &'a dyn OrderFilter,
}

impl<'a> AndFilter<'a> {
    pub fn new(left: &'a dyn OrderFilter, right: &'a dyn OrderFilter) -> Self {
        AndFilter { left, right }
    }
}

impl<'a> OrderFilter for AndFilter<'a> {
    fn accepts(&self, order: &Order) -> bool {
        self.left.accepts(order) && self.right.accepts(order)
    }
}

/// An ordered collection of `Order`s, independent of insertion order for
/// every operation this crate performs on it.
#[derive(Clone, Debug, Default)]
pub struct OrderBook {
    orders: Vec<Order>,
}

impl OrderBook {
    pub fn new(orders: Vec<Order>) -> Self {
        OrderBook { orders }
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Returns the subset of orders accepted by `filter`.
    pub fn filter<'a>(&'a self, filter: &'a dyn OrderFilter) -> impl Iterator<Item = &'a Order> + 'a {
        self.orders.iter().filter(move |order| filter.accepts(order))
    }
}

impl IntoIterator for OrderBook {
    type Item = Order;
    type IntoIter = std::vec::IntoIter<Order>;

    fn into_iter(self) -> Self::IntoIter {
        self.orders.into_iter()
    }
}
