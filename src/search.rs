//! `PathFinder`: best-first frontier search with dominance pruning, a
//! tolerance-amplified cost ceiling, and a bounded Top-K heap (§4.7).
//!
//! The teacher's search (`orderbook::graph::find_path`) is a textbook
//! Bellman-Ford relaxation over a static weight matrix: no dominance
//! registry, no Top-K, no spend propagation, because its estimates don't
//! need to respect per-order capacity. This is the one component with no
//! direct teacher analogue to adapt — it is written in the teacher's idiom
//! (small owned structs, `BinaryHeap`-driven frontier, explicit `Ordering`
//! plumbing) rather than grounded on a specific teacher function.

use crate::decimal::{Decimal, DecimalMath};
use crate::error::CoreError;
use crate::graph::{Edge, Graph, CANONICAL_SCALE};
use crate::guards::{Clock, SearchGuardConfig, SearchGuardReport, SearchGuards, SystemClock};
use crate::money::{Currency, Money};
use crate::order_strategy::{CanonicalOrderStrategy, OrderingContext, PathOrderStrategy};
use crate::spend::SpendRange;
use crate::tolerance::ToleranceWindow;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::Arc;

/// One materialization-ready candidate emitted by the frontier (§3).
#[derive(Clone, Debug)]
pub struct CandidatePath {
    pub cost: Decimal,
    pub product: Decimal,
    pub hops: usize,
    pub edges: Vec<Edge>,
    pub amount_range: Option<SpendRange>,
    pub desired_amount: Option<Money>,
}

/// Caller hook invoked once per target-reaching candidate (§4.7.8).
pub trait Acceptor {
    fn accept(&mut self, candidate: &CandidatePath) -> Result<bool, CoreError>;
}

/// Accepts every candidate; the default when no callback is supplied.
#[derive(Clone, Copy, Debug, Default)]
pub struct AcceptAll;

impl Acceptor for AcceptAll {
    fn accept(&mut self, _candidate: &CandidatePath) -> Result<bool, CoreError> {
        Ok(true)
    }
}

/// Validated `PathFinder` configuration (§4.7.1).
#[derive(Clone)]
pub struct PathFinderConfig {
    min_hops: usize,
    max_hops: usize,
    tolerance: ToleranceWindow,
    top_k: usize,
    guard_config: SearchGuardConfig,
    ordering_strategy: Option<Arc<dyn PathOrderStrategy + Send + Sync>>,
}

impl PathFinderConfig {
    pub fn new(
        min_hops: usize,
        max_hops: usize,
        tolerance: ToleranceWindow,
        top_k: usize,
        guard_config: SearchGuardConfig,
        ordering_strategy: Option<Arc<dyn PathOrderStrategy + Send + Sync>>,
    ) -> Result<Self, CoreError> {
        if max_hops < 1 {
            return Err(CoreError::invalid_input("max_hops must be >= 1"));
        }
        if min_hops > max_hops {
            return Err(CoreError::invalid_input(
                "min_hops must not exceed max_hops",
            ));
        }
        if top_k < 1 {
            return Err(CoreError::invalid_input("top_k must be >= 1"));
        }
        Ok(PathFinderConfig {
            min_hops,
            max_hops,
            tolerance,
            top_k,
            guard_config,
            ordering_strategy,
        })
    }

    pub fn tolerance(&self) -> &ToleranceWindow {
        &self.tolerance
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

/// A `(node, signature)` dominance record (§3).
#[derive(Clone, Debug)]
struct SearchStateRecord {
    cost: Decimal,
    hops: usize,
}

#[derive(Clone, Debug)]
struct SearchState {
    node: Currency,
    cost: Decimal,
    product: Decimal,
    hops: usize,
    path_edges: Vec<Edge>,
    signature: String,
    visited_nodes: HashSet<String>,
    spend_range: Option<SpendRange>,
    desired_spend: Option<Money>,
}

struct FrontierEntry {
    cost: Decimal,
    hops: usize,
    route_signature: String,
    insertion_order: u64,
    strategy: Arc<dyn PathOrderStrategy + Send + Sync>,
    state: SearchState,
}

impl FrontierEntry {
    fn context(&self) -> OrderingContext<'_> {
        OrderingContext {
            cost: &self.cost,
            hops: self.hops,
            route_signature: &self.route_signature,
            insertion_order: self.insertion_order,
        }
    }
}

impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.strategy.compare(self.context(), other.context()) == Ordering::Equal
    }
}

impl Eq for FrontierEntry {}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so pop() yields the canonically
        // smallest (best) entry first.
        self.strategy.compare(other.context(), self.context())
    }
}

struct TopKEntry {
    cost: Decimal,
    hops: usize,
    route_signature: String,
    insertion_order: u64,
    strategy: Arc<dyn PathOrderStrategy + Send + Sync>,
    candidate: CandidatePath,
}

impl TopKEntry {
    fn context(&self) -> OrderingContext<'_> {
        OrderingContext {
            cost: &self.cost,
            hops: self.hops,
            route_signature: &self.route_signature,
            insertion_order: self.insertion_order,
        }
    }
}

impl PartialEq for TopKEntry {
    fn eq(&self, other: &Self) -> bool {
        self.strategy.compare(self.context(), other.context()) == Ordering::Equal
    }
}

impl Eq for TopKEntry {}

impl PartialOrd for TopKEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TopKEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Natural order: the worst (canonically largest) candidate sorts
        // to the top, so it is the one evicted when the heap is full.
        self.strategy.compare(self.context(), other.context())
    }
}

fn build_signature(range: Option<&SpendRange>, desired: Option<&Money>) -> String {
    let range_segment = match range {
        Some(r) => format!(
            "range:{}:{}:{}",
            r.min().currency(),
            r.min().amount().to_canonical_string(),
            r.max().amount().to_canonical_string()
        ),
        None => "range:null".to_string(),
    };
    let desired_segment = match desired {
        Some(m) => format!("desired:{}:{}", m.currency(), m.amount().to_canonical_string()),
        None => "desired:null".to_string(),
    };
    format!("{}| {}", range_segment, desired_segment)
}

fn route_signature_of(edges: &[Edge]) -> String {
    edges
        .iter()
        .map(|e| {
            format!(
                "{}>{}:{}:{}",
                e.from(),
                e.to(),
                e.order_side(),
                e.order().fee_fingerprint()
            )
        })
        .collect::<Vec<_>>()
        .join("|")
}

fn dominates(cost: &Decimal, hops: usize, other_cost: &Decimal, other_hops: usize) -> Result<bool, CoreError> {
    let cost_le = DecimalMath::comp(cost, other_cost, CANONICAL_SCALE)? != Ordering::Greater;
    let cost_lt = DecimalMath::comp(cost, other_cost, CANONICAL_SCALE)? == Ordering::Less;
    let hops_le = hops <= other_hops;
    let hops_lt = hops < other_hops;
    Ok(cost_le && hops_le && (cost_lt || hops_lt))
}

fn is_dominated_by_existing(
    records: &[SearchStateRecord],
    cost: &Decimal,
    hops: usize,
) -> Result<bool, CoreError> {
    for record in records {
        if DecimalMath::comp(&record.cost, cost, CANONICAL_SCALE)? != Ordering::Greater
            && record.hops <= hops
        {
            return Ok(true);
        }
    }
    Ok(false)
}

fn edge_supports_amount(edge: &Edge, range: Option<&SpendRange>) -> Result<Option<SpendRange>, CoreError> {
    let source_cap = edge.source_capacity();
    let candidate = SpendRange::new(source_cap.min().clone(), source_cap.max().clone())?;
    match range {
        None => Ok(Some(candidate)),
        Some(r) => candidate.intersect(r),
    }
}

const INTERPOLATION_SCALE: u32 = 24;

fn compute_next_range(edge: &Edge, intersected: &SpendRange) -> Result<SpendRange, CoreError> {
    let source_cap = edge.source_capacity();
    let dest_cap = edge.destination_capacity();
    let src_min = source_cap.min().amount();
    let src_max = source_cap.max().amount();
    let width_is_zero = DecimalMath::comp(src_min, src_max, INTERPOLATION_SCALE)? == Ordering::Equal;

    let interpolate = |x: &Decimal| -> Result<Decimal, CoreError> {
        if width_is_zero {
            return Ok(dest_cap.min().amount().clone());
        }
        let numerator = DecimalMath::sub(x, src_min, INTERPOLATION_SCALE)?;
        let src_width = DecimalMath::sub(src_max, src_min, INTERPOLATION_SCALE)?;
        let ratio = DecimalMath::div(&numerator, &src_width, INTERPOLATION_SCALE)?;
        let dest_min = dest_cap.min().amount();
        let dest_max = dest_cap.max().amount();
        let dest_width = DecimalMath::sub(dest_max, dest_min, INTERPOLATION_SCALE)?;
        let offset = DecimalMath::mul(&ratio, &dest_width, INTERPOLATION_SCALE)?;
        DecimalMath::add(dest_min, &offset, INTERPOLATION_SCALE)
    };

    let min_amount = interpolate(intersected.min().amount())?;
    let max_amount = interpolate(intersected.max().amount())?;

    let dest_currency = dest_cap.min().currency().clone();
    let dest_scale = dest_cap.min().scale().max(dest_cap.max().scale());
    let min_money = Money::new(dest_currency.clone(), DecimalMath::normalize(&min_amount, dest_scale)?)?;
    let max_money = Money::new(dest_currency, DecimalMath::normalize(&max_amount, dest_scale)?)?;
    let proposed = SpendRange::new(min_money, max_money)?;

    let dest_range = SpendRange::new(dest_cap.min().clone(), dest_cap.max().clone())?;
    let clamped_min = dest_range.clamp(proposed.min())?;
    let clamped_max = dest_range.clamp(proposed.max())?;
    SpendRange::new(clamped_min, clamped_max)
}

#[allow(clippy::too_many_arguments)]
fn try_register_and_push(
    registry: &mut HashMap<String, HashMap<String, Vec<SearchStateRecord>>>,
    frontier: &mut BinaryHeap<FrontierEntry>,
    insertion_counter: &mut u64,
    visited_states: &mut u64,
    max_visited_states: Option<u64>,
    strategy: &Arc<dyn PathOrderStrategy + Send + Sync>,
    state: SearchState,
) -> Result<bool, CoreError> {
    if let Some(limit) = max_visited_states {
        if *visited_states >= limit {
            return Ok(false);
        }
    }

    let node_key = state.node.as_str().to_string();
    let signature = state.signature.clone();
    let records = registry
        .entry(node_key)
        .or_insert_with(HashMap::new)
        .entry(signature)
        .or_insert_with(Vec::new);

    if is_dominated_by_existing(records, &state.cost, state.hops)? {
        return Ok(false);
    }
    let mut retain_errors = Ok(());
    records.retain(|r| match dominates(&state.cost, state.hops, &r.cost, r.hops) {
        Ok(true) => false,
        Ok(false) => true,
        Err(e) => {
            retain_errors = Err(e);
            true
        }
    });
    retain_errors?;
    records.push(SearchStateRecord {
        cost: state.cost.clone(),
        hops: state.hops,
    });

    *visited_states += 1;
    let route_signature = route_signature_of(&state.path_edges);
    let order = *insertion_counter;
    *insertion_counter += 1;
    frontier.push(FrontierEntry {
        cost: state.cost.clone(),
        hops: state.hops,
        route_signature,
        insertion_order: order,
        strategy: strategy.clone(),
        state,
    });
    Ok(true)
}

fn insert_top_k(
    heap: &mut BinaryHeap<TopKEntry>,
    entry: TopKEntry,
    top_k: usize,
) {
    if heap.len() < top_k {
        heap.push(entry);
        return;
    }
    let should_replace = heap
        .peek()
        .map(|worst| entry.strategy.compare(entry.context(), worst.context()) == Ordering::Less)
        .unwrap_or(true);
    if should_replace {
        heap.pop();
        heap.push(entry);
    }
}

fn drain_top_k(mut heap: BinaryHeap<TopKEntry>) -> Vec<CandidatePath> {
    let mut items = Vec::with_capacity(heap.len());
    while let Some(entry) = heap.pop() {
        items.push(entry);
    }
    items.reverse();
    items.into_iter().map(|entry| entry.candidate).collect()
}

/// Best-first search over a `Graph`. Holds only read-only configuration;
/// all per-search mutable state lives on the stack of `find_best_paths`.
pub struct PathFinder {
    config: PathFinderConfig,
}

impl PathFinder {
    pub fn new(config: PathFinderConfig) -> Self {
        PathFinder { config }
    }

    pub fn find_best_paths(
        &self,
        graph: &Graph,
        source: &Currency,
        target: &Currency,
        initial_range: Option<SpendRange>,
        desired_spend: Option<Money>,
        acceptor: &mut dyn Acceptor,
    ) -> Result<(Vec<CandidatePath>, SearchGuardReport), CoreError> {
        self.find_best_paths_with_clock(
            graph,
            source,
            target,
            initial_range,
            desired_spend,
            acceptor,
            Box::new(SystemClock),
        )
    }

    pub fn find_best_paths_with_clock(
        &self,
        graph: &Graph,
        source: &Currency,
        target: &Currency,
        initial_range: Option<SpendRange>,
        desired_spend: Option<Money>,
        acceptor: &mut dyn Acceptor,
        clock: Box<dyn Clock>,
    ) -> Result<(Vec<CandidatePath>, SearchGuardReport), CoreError> {
        let mut guards = SearchGuards::new(self.config.guard_config.clone(), clock);
        let strategy: Arc<dyn PathOrderStrategy + Send + Sync> = self
            .config
            .ordering_strategy
            .clone()
            .unwrap_or_else(|| Arc::new(CanonicalOrderStrategy));

        let mut frontier: BinaryHeap<FrontierEntry> = BinaryHeap::new();
        let mut registry: HashMap<String, HashMap<String, Vec<SearchStateRecord>>> = HashMap::new();
        let mut top_k_heap: BinaryHeap<TopKEntry> = BinaryHeap::new();
        let mut best_target_cost: Option<Decimal> = None;
        let mut insertion_counter: u64 = 0;
        let mut visited_states: u64 = 0;
        let max_visited_states = self.config.guard_config.max_visited_states();

        let mut initial_visited = HashSet::new();
        initial_visited.insert(source.as_str().to_string());
        let initial_signature = build_signature(initial_range.as_ref(), desired_spend.as_ref());
        let initial_state = SearchState {
            node: source.clone(),
            cost: Decimal::one(),
            product: Decimal::one(),
            hops: 0,
            path_edges: Vec::new(),
            signature: initial_signature,
            visited_nodes: initial_visited,
            spend_range: initial_range,
            desired_spend,
        };
        try_register_and_push(
            &mut registry,
            &mut frontier,
            &mut insertion_counter,
            &mut visited_states,
            max_visited_states,
            &strategy,
            initial_state,
        )?;

        let mut expansion_limit_reached = false;

        while let Some(entry) = frontier.pop() {
            if !guards.can_expand() {
                expansion_limit_reached = true;
                log::debug!(
                    "search truncated after {} visited states with {} candidates in the top-k heap",
                    visited_states,
                    top_k_heap.len(),
                );
                break;
            }
            guards.record_expansion();
            let state = entry.state;

            let reaches_target = &state.node == target;
            let satisfies_hops =
                state.hops >= self.config.min_hops || (state.hops == 0 && source == target);

            if reaches_target && satisfies_hops {
                let candidate = CandidatePath {
                    cost: state.cost.clone(),
                    product: state.product.clone(),
                    hops: state.hops,
                    edges: state.path_edges.clone(),
                    amount_range: state.spend_range.clone(),
                    desired_amount: state.desired_spend.clone(),
                };
                let accepted = acceptor.accept(&candidate)?;
                let improves_best = best_target_cost
                    .as_ref()
                    .map(|best| {
                        DecimalMath::comp(&state.cost, best, CANONICAL_SCALE)
                            .map(|o| o == Ordering::Less)
                            .unwrap_or(false)
                    })
                    .unwrap_or(true);
                if improves_best {
                    best_target_cost = Some(state.cost.clone());
                }
                if accepted {
                    let top_entry = TopKEntry {
                        cost: state.cost.clone(),
                        hops: state.hops,
                        route_signature: entry.route_signature.clone(),
                        insertion_order: entry.insertion_order,
                        strategy: strategy.clone(),
                        candidate,
                    };
                    insert_top_k(&mut top_k_heap, top_entry, self.config.top_k);
                }
                continue;
            }

            if state.hops == self.config.max_hops {
                continue;
            }

            for edge in graph.edges_from(&state.node) {
                if DecimalMath::comp(edge.effective_conversion_rate(), &Decimal::zero(), CANONICAL_SCALE)?
                    != Ordering::Greater
                {
                    continue;
                }
                if state.visited_nodes.contains(edge.to().as_str()) {
                    continue;
                }
                let supported = edge_supports_amount(edge, state.spend_range.as_ref())?;
                let intersected = match supported {
                    Some(range) => range,
                    None => continue,
                };
                let next_range = compute_next_range(edge, &intersected)?;

                let new_cost = DecimalMath::div(&state.cost, edge.effective_conversion_rate(), CANONICAL_SCALE)?;
                let new_product = DecimalMath::mul(&state.product, edge.effective_conversion_rate(), CANONICAL_SCALE)?;
                let new_hops = state.hops + 1;

                if let Some(best) = &best_target_cost {
                    let amplifier = self.config.tolerance.amplifier()?;
                    let max_allowed = DecimalMath::mul(best, &amplifier, CANONICAL_SCALE)?;
                    if DecimalMath::comp(&new_cost, &max_allowed, CANONICAL_SCALE)? == Ordering::Greater {
                        continue;
                    }
                }

                let mut new_visited = state.visited_nodes.clone();
                new_visited.insert(edge.to().as_str().to_string());
                let mut new_path_edges = state.path_edges.clone();
                new_path_edges.push(edge.clone());
                let new_signature = build_signature(Some(&next_range), state.desired_spend.as_ref());

                let new_state = SearchState {
                    node: edge.to().clone(),
                    cost: new_cost,
                    product: new_product,
                    hops: new_hops,
                    path_edges: new_path_edges,
                    signature: new_signature,
                    visited_nodes: new_visited,
                    spend_range: Some(next_range),
                    desired_spend: state.desired_spend.clone(),
                };

                try_register_and_push(
                    &mut registry,
                    &mut frontier,
                    &mut insertion_counter,
                    &mut visited_states,
                    max_visited_states,
                    &strategy,
                    new_state,
                )?;
            }
        }

        let report = guards.finalize(visited_states, expansion_limit_reached);
        if report.breached.any && guards.throw_on_limit() {
            log::error!("aborting search: guard limit exceeded and throw_on_limit is set");
            return Err(CoreError::guard_limit_exceeded(report));
        }
        Ok((drain_top_k(top_k_heap), report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::OrderBounds;
    use crate::fee::ProportionalFee;
    use crate::graph::GraphBuilder;
    use crate::order::{Order, OrderSide};
    use crate::rate::{AssetPair, ExchangeRate};
    use std::sync::Arc as StdArc;

    fn currency(code: &str) -> Currency {
        Currency::new(code).unwrap()
    }

    fn money(code: &str, amount: &str, scale: u32) -> Money {
        Money::new(currency(code), Decimal::parse(amount, scale).unwrap()).unwrap()
    }

    fn buy_order(base: &str, quote: &str, min: &str, max: &str, rate: &str) -> Order {
        let pair = AssetPair::new(currency(base), currency(quote)).unwrap();
        let bounds = OrderBounds::new(money(base, min, 2), money(base, max, 2)).unwrap();
        let exchange_rate = ExchangeRate::new(currency(base), currency(quote), Decimal::parse(rate, 6).unwrap()).unwrap();
        Order::new(OrderSide::Buy, pair, bounds, exchange_rate, None).unwrap()
    }

    fn default_config(top_k: usize, max_hops: usize) -> PathFinderConfig {
        let tolerance = ToleranceWindow::new(
            Decimal::parse("0", 18).unwrap(),
            Decimal::parse("0", 18).unwrap(),
        )
        .unwrap();
        let guard_config = SearchGuardConfig::new(Some(10_000), Some(10_000), None, false).unwrap();
        PathFinderConfig::new(0, max_hops, tolerance, top_k, guard_config, None).unwrap()
    }

    #[test]
    fn zero_hop_path_when_source_equals_target() {
        let graph = Graph::default();
        let finder = PathFinder::new(default_config(1, 3));
        let usd = currency("USD");
        let (results, _report) = finder
            .find_best_paths(&graph, &usd, &usd, None, None, &mut AcceptAll)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].hops, 0);
        assert_eq!(results[0].cost.to_canonical_string(), "1.000000000000000000");
    }

    #[test]
    fn finds_direct_path_and_prefers_better_cost() {
        let direct = buy_order("USD", "EUR", "1", "1000", "0.90");
        let via_gbp_a = buy_order("USD", "GBP", "1", "1000", "0.80");
        let graph = GraphBuilder::build(vec![&direct, &via_gbp_a]).unwrap();
        let finder = PathFinder::new(default_config(2, 1));
        let usd = currency("USD");
        let eur = currency("EUR");
        let (results, _report) = finder
            .find_best_paths(&graph, &usd, &eur, None, None, &mut AcceptAll)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].edges.len(), 1);
        assert_eq!(results[0].edges[0].to(), &eur);
    }

    #[test]
    fn acyclic_constraint_prevents_revisiting_a_node() {
        let to_eur = buy_order("USD", "EUR", "1", "1000", "0.9");
        let back_to_usd = buy_order("EUR", "USD", "1", "1000", "1.1");
        let graph = GraphBuilder::build(vec![&to_eur, &back_to_usd]).unwrap();
        let finder = PathFinder::new(default_config(5, 5));
        let usd = currency("USD");
        let (results, _report) = finder
            .find_best_paths(&graph, &usd, &usd, None, None, &mut AcceptAll)
            .unwrap();
        // only the trivial 0-hop candidate; USD -> EUR -> USD would revisit USD
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].hops, 0);
    }

    #[test]
    fn rejecting_acceptor_still_tightens_the_cost_ceiling() {
        struct RejectAll;
        impl Acceptor for RejectAll {
            fn accept(&mut self, _candidate: &CandidatePath) -> Result<bool, CoreError> {
                Ok(false)
            }
        }
        let direct = buy_order("USD", "EUR", "1", "1000", "0.9");
        let graph = GraphBuilder::build(vec![&direct]).unwrap();
        let finder = PathFinder::new(default_config(3, 2));
        let usd = currency("USD");
        let eur = currency("EUR");
        let (results, _report) = finder
            .find_best_paths(&graph, &usd, &eur, None, None, &mut RejectAll)
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn fee_bearing_edges_still_search_correctly() {
        let pair = AssetPair::new(currency("USD"), currency("EUR")).unwrap();
        let bounds = OrderBounds::new(money("USD", "10", 2), money("USD", "100", 2)).unwrap();
        let rate = ExchangeRate::new(currency("USD"), currency("EUR"), Decimal::parse("0.9", 6).unwrap()).unwrap();
        let fee = StdArc::new(ProportionalFee::new(Decimal::parse("0.01", 4).unwrap()).unwrap());
        let order = Order::new(OrderSide::Buy, pair, bounds, rate, Some(fee)).unwrap();
        let graph = GraphBuilder::build(std::iter::once(&order)).unwrap();
        let finder = PathFinder::new(default_config(1, 1));
        let usd = currency("USD");
        let eur = currency("EUR");
        let (results, _report) = finder
            .find_best_paths(&graph, &usd, &eur, None, None, &mut AcceptAll)
            .unwrap();
        assert_eq!(results.len(), 1);
    }
}
