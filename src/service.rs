//! `PathSearchService`: the orchestrator that ties order filtering, graph
//! construction, search, and materialization together (§4.10).

use crate::decimal::Decimal;
use crate::error::CoreError;
use crate::graph::{Edge, GraphBuilder};
use crate::guards::{Clock, GuardBreaches, GuardLimits, GuardMetrics, SearchGuardConfig, SearchGuardReport, SystemClock};
use crate::materialize::{LegMaterializer, PathLeg};
use crate::money::{Currency, Money};
use crate::order::{AndFilter, ByBoundsOverlap, ByCurrencyRelevance, Order, OrderBook, OrderFilter};
use crate::order_strategy::PathOrderStrategy;
use crate::search::{Acceptor, CandidatePath, PathFinder, PathFinderConfig};
use crate::spend::SpendConstraints;
use crate::tolerance::ToleranceWindow;
use crate::tolerance_eval::ToleranceEvaluator;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Validated configuration for a single `PathSearchService::search` call
/// (§4.7.1, §6).
#[derive(Clone)]
pub struct PathSearchConfig {
    spend: SpendConstraints,
    tolerance: ToleranceWindow,
    min_hops: usize,
    max_hops: usize,
    top_k: usize,
    guard_config: SearchGuardConfig,
    ordering_strategy: Option<Arc<dyn PathOrderStrategy + Send + Sync>>,
}

impl PathSearchConfig {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        spend: SpendConstraints,
        tolerance: ToleranceWindow,
        min_hops: usize,
        max_hops: usize,
        top_k: usize,
        guard_config: SearchGuardConfig,
        ordering_strategy: Option<Arc<dyn PathOrderStrategy + Send + Sync>>,
    ) -> Result<Self, CoreError> {
        if max_hops < 1 {
            return Err(CoreError::invalid_input("max_hops must be >= 1"));
        }
        if min_hops > max_hops {
            return Err(CoreError::invalid_input("min_hops must not exceed max_hops"));
        }
        if top_k < 1 {
            return Err(CoreError::invalid_input("top_k must be >= 1"));
        }
        Ok(PathSearchConfig {
            spend,
            tolerance,
            min_hops,
            max_hops,
            top_k,
            guard_config,
            ordering_strategy,
        })
    }

    pub fn spend(&self) -> &SpendConstraints {
        &self.spend
    }

    pub fn tolerance(&self) -> &ToleranceWindow {
        &self.tolerance
    }

    pub fn min_hops(&self) -> usize {
        self.min_hops
    }

    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn guard_config(&self) -> &SearchGuardConfig {
        &self.guard_config
    }

    pub fn ordering_strategy(&self) -> Option<Arc<dyn PathOrderStrategy + Send + Sync>> {
        self.ordering_strategy.clone()
    }
}

/// One fully resolved, tolerance-accepted path (§3, §6).
#[derive(Clone, Debug, serde::Serialize)]
pub struct PathResult {
    pub total_spent: Money,
    pub total_received: Money,
    pub residual_tolerance: Decimal,
    pub legs: Vec<PathLeg>,
    pub fee_breakdown: BTreeMap<String, Money>,
}

/// An ordered, `topK`-bounded set of accepted `PathResult`s (cost ascending).
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct PathResultSet {
    paths: Vec<PathResult>,
}

impl PathResultSet {
    fn new(paths: Vec<PathResult>) -> Self {
        PathResultSet { paths }
    }

    pub fn paths(&self) -> &[PathResult] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn into_inner(self) -> Vec<PathResult> {
        self.paths
    }
}

/// The service's aggregate result: accepted paths plus the guard report
/// from the underlying search (§6).
#[derive(Clone, Debug, serde::Serialize)]
pub struct SearchOutcome {
    pub paths: PathResultSet,
    pub guard_report: SearchGuardReport,
}

impl SearchOutcome {
    fn empty(guard_config: &SearchGuardConfig) -> Self {
        SearchOutcome {
            paths: PathResultSet::default(),
            guard_report: SearchGuardReport {
                limits: GuardLimits {
                    expansions: guard_config.max_expansions(),
                    visited_states: guard_config.max_visited_states(),
                    time_budget_ms: guard_config.time_budget_ms(),
                },
                metrics: GuardMetrics::default(),
                breached: GuardBreaches::default(),
            },
        }
    }
}

/// Resolves the amount the first leg of a candidate should be materialized
/// against: the configured desired spend, clamped into the first edge's
/// source-side capacity (or left untouched for a 0-hop candidate).
fn determine_initial_spend_amount(config: &PathSearchConfig, first_edge: Option<&Edge>) -> Result<Money, CoreError> {
    let desired = config.spend().effective_desired()?;
    match first_edge {
        None => Ok(desired),
        Some(edge) => {
            let source_cap = edge.source_capacity();
            let range = crate::spend::SpendRange::new(source_cap.min().clone(), source_cap.max().clone())?;
            let normalized = range.normalize_with(&desired)?;
            normalized.clamp(&desired)
        }
    }
}

/// Materializes `candidate`, checks it lands on `target`, and evaluates its
/// residual against the configured tolerance window. Returns `None` for any
/// rejection (infeasible materialization, wrong destination, out-of-window
/// spend) per the "reject silently, search continues" propagation policy.
fn build_path_result(
    config: &PathSearchConfig,
    target: &Currency,
    candidate: &CandidatePath,
) -> Result<Option<PathResult>, CoreError> {
    if candidate.hops < config.min_hops() || candidate.hops > config.max_hops() {
        return Ok(None);
    }
    let initial_spend = determine_initial_spend_amount(config, candidate.edges.first())?;
    let materialized = match LegMaterializer::materialize(candidate, initial_spend) {
        Ok(materialized) => materialized,
        Err(_) => return Ok(None),
    };
    if materialized.total_received.currency() != target {
        return Ok(None);
    }
    let desired = config.spend().effective_desired()?;
    let residual = match ToleranceEvaluator::evaluate(&desired, &materialized.total_spent, config.tolerance())? {
        Some(residual) => residual,
        None => return Ok(None),
    };
    Ok(Some(PathResult {
        total_spent: materialized.total_spent,
        total_received: materialized.total_received,
        residual_tolerance: residual,
        legs: materialized.legs,
        fee_breakdown: materialized.fee_breakdown,
    }))
}

/// The acceptor driving `PathFinder`'s frontier: a candidate is accepted
/// into the Top-K heap iff it materializes and lands within tolerance
/// (§4.7.8, §4.10 step 4).
struct MaterializingAcceptor<'a> {
    config: &'a PathSearchConfig,
    target: &'a Currency,
}

impl Acceptor for MaterializingAcceptor<'_> {
    fn accept(&mut self, candidate: &CandidatePath) -> Result<bool, CoreError> {
        Ok(build_path_result(self.config, self.target, candidate)?.is_some())
    }
}

/// Orchestrates order filtering, graph construction, search, and
/// materialization into a `SearchOutcome` (§4.10).
#[derive(Clone, Copy, Debug, Default)]
pub struct PathSearchService;

impl PathSearchService {
    /// Runs a search from `source` to `target` using the system clock.
    pub fn search(
        &self,
        order_book: &OrderBook,
        source: &str,
        target: &str,
        config: &PathSearchConfig,
        custom_filter: Option<&dyn OrderFilter>,
    ) -> Result<SearchOutcome, CoreError> {
        self.search_with_clock(order_book, source, target, config, custom_filter, Box::new(SystemClock))
    }

    /// Runs a search with an injectable clock, for deterministic testing of
    /// the time-budget guard end to end.
    pub fn search_with_clock(
        &self,
        order_book: &OrderBook,
        source: &str,
        target: &str,
        config: &PathSearchConfig,
        custom_filter: Option<&dyn OrderFilter>,
        clock: Box<dyn Clock>,
    ) -> Result<SearchOutcome, CoreError> {
        if target.trim().is_empty() {
            return Err(CoreError::invalid_input("target currency must not be empty"));
        }
        if source.trim().is_empty() {
            return Err(CoreError::invalid_input("source currency must not be empty"));
        }
        let source_currency = Currency::new(source.to_ascii_uppercase())?;
        let target_currency = Currency::new(target.to_ascii_uppercase())?;
        let trivial = source_currency == target_currency;

        let spend_window = config.spend().range()?;
        let relevance = ByCurrencyRelevance::new(vec![source_currency.clone(), target_currency.clone()]);
        let bounds_overlap = ByBoundsOverlap::new(spend_window.clone());
        let builtin = AndFilter::new(&relevance, &bounds_overlap);

        let filtered: Vec<Order> = match custom_filter {
            Some(custom) => order_book.filter(&AndFilter::new(&builtin, custom)).cloned().collect(),
            None => order_book.filter(&builtin).cloned().collect(),
        };

        if filtered.is_empty() && !trivial {
            return Ok(SearchOutcome::empty(config.guard_config()));
        }

        let graph = GraphBuilder::build(filtered.iter())?;
        if !trivial && (!graph.contains(&source_currency) || !graph.contains(&target_currency)) {
            return Ok(SearchOutcome::empty(config.guard_config()));
        }

        let finder_config = PathFinderConfig::new(
            config.min_hops(),
            config.max_hops(),
            config.tolerance().clone(),
            config.top_k(),
            config.guard_config().clone(),
            config.ordering_strategy(),
        )?;
        let finder = PathFinder::new(finder_config);
        let mut acceptor = MaterializingAcceptor {
            config,
            target: &target_currency,
        };
        let desired_spend = Some(config.spend().effective_desired()?);

        let (candidates, guard_report) = finder.find_best_paths_with_clock(
            &graph,
            &source_currency,
            &target_currency,
            Some(spend_window),
            desired_spend,
            &mut acceptor,
            clock,
        )?;

        let mut results = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            if let Some(result) = build_path_result(config, &target_currency, candidate)? {
                results.push(result);
            }
        }

        Ok(SearchOutcome {
            paths: PathResultSet::new(results),
            guard_report,
        })
    }
}
