//! `SearchGuards`: bounded expansions, visited-state budget, and an
//! injectable wall-clock budget for `PathFinder` (§4.6).

use crate::error::CoreError;
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of milliseconds, injectable so tests can drive the time budget
/// deterministically instead of racing a real clock.
pub trait Clock: std::fmt::Debug {
    fn now_ms(&self) -> u64;
}

/// The default `Clock`, backed by the system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Configured limits, each `None` meaning unbounded.
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct GuardLimits {
    pub expansions: Option<u64>,
    pub visited_states: Option<u64>,
    pub time_budget_ms: Option<u64>,
}

/// Observed counters at the moment a search finished or was cut short.
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct GuardMetrics {
    pub expansions: u64,
    pub visited_states: u64,
    pub elapsed_ms: f64,
}

/// Which limits (if any) were actually breached.
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct GuardBreaches {
    pub expansions: bool,
    pub visited_states: bool,
    pub time_budget: bool,
    pub any: bool,
}

/// A post-search report of guard limits, observed metrics, and which (if
/// any) limits were breached.
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct SearchGuardReport {
    pub limits: GuardLimits,
    pub metrics: GuardMetrics,
    pub breached: GuardBreaches,
}

/// Configuration for `SearchGuards` (§4.6).
#[derive(Clone, Debug)]
pub struct SearchGuardConfig {
    max_expansions: Option<u64>,
    max_visited_states: Option<u64>,
    time_budget_ms: Option<u64>,
    throw_on_limit: bool,
}

impl SearchGuardConfig {
    pub fn new(
        max_expansions: Option<u64>,
        max_visited_states: Option<u64>,
        time_budget_ms: Option<u64>,
        throw_on_limit: bool,
    ) -> Result<Self, CoreError> {
        if max_expansions == Some(0) {
            return Err(CoreError::invalid_input("max_expansions must be >= 1"));
        }
        if max_visited_states == Some(0) {
            return Err(CoreError::invalid_input("max_visited_states must be >= 1"));
        }
        if time_budget_ms == Some(0) {
            return Err(CoreError::invalid_input("time_budget_ms must be >= 1"));
        }
        Ok(SearchGuardConfig {
            max_expansions,
            max_visited_states,
            time_budget_ms,
            throw_on_limit,
        })
    }

    pub fn throw_on_limit(&self) -> bool {
        self.throw_on_limit
    }

    pub fn max_expansions(&self) -> Option<u64> {
        self.max_expansions
    }

    pub fn max_visited_states(&self) -> Option<u64> {
        self.max_visited_states
    }

    pub fn time_budget_ms(&self) -> Option<u64> {
        self.time_budget_ms
    }
}

/// Per-search mutable guard state. Created and discarded within a single
/// `findBestPaths` call; never shared across searches.
#[derive(Debug)]
pub struct SearchGuards {
    config: SearchGuardConfig,
    clock: Box<dyn Clock>,
    start_time_ms: u64,
    expansions: u64,
    time_budget_reached: bool,
}

impl SearchGuards {
    pub fn new(config: SearchGuardConfig, clock: Box<dyn Clock>) -> Self {
        let start_time_ms = clock.now_ms();
        SearchGuards {
            config,
            clock,
            start_time_ms,
            expansions: 0,
            time_budget_reached: false,
        }
    }

    pub fn with_system_clock(config: SearchGuardConfig) -> Self {
        SearchGuards::new(config, Box::new(SystemClock))
    }

    fn elapsed_ms(&self) -> u64 {
        self.clock.now_ms().saturating_sub(self.start_time_ms)
    }

    /// `false` once any configured limit has been reached.
    pub fn can_expand(&mut self) -> bool {
        if let Some(limit) = self.config.max_expansions {
            if self.expansions >= limit {
                return false;
            }
        }
        if let Some(budget) = self.config.time_budget_ms {
            if self.elapsed_ms() >= budget {
                self.time_budget_reached = true;
                return false;
            }
        }
        true
    }

    pub fn record_expansion(&mut self) {
        self.expansions += 1;
    }

    pub fn throw_on_limit(&self) -> bool {
        self.config.throw_on_limit
    }

    /// Builds the final report. `visited_states` and
    /// `expansion_limit_reached` are supplied by the caller since only it
    /// tracks registry size and whether expansion actually stopped because
    /// of the expansion cap (as opposed to an empty queue).
    pub fn finalize(&self, visited_states: u64, expansion_limit_reached: bool) -> SearchGuardReport {
        let visited_states_breached = self
            .config
            .max_visited_states
            .map(|limit| visited_states >= limit)
            .unwrap_or(false);
        let expansions_breached = expansion_limit_reached
            || self
                .config
                .max_expansions
                .map(|limit| self.expansions >= limit)
                .unwrap_or(false);
        let time_budget_breached = self.time_budget_reached
            || self
                .config
                .time_budget_ms
                .map(|budget| self.elapsed_ms() >= budget)
                .unwrap_or(false);
        let any = visited_states_breached || expansions_breached || time_budget_breached;
        if any {
            log::warn!(
                "search guard breached: expansions={} visited_states={} time_budget={}",
                expansions_breached,
                visited_states_breached,
                time_budget_breached,
            );
        }

        SearchGuardReport {
            limits: GuardLimits {
                expansions: self.config.max_expansions,
                visited_states: self.config.max_visited_states,
                time_budget_ms: self.config.time_budget_ms,
            },
            metrics: GuardMetrics {
                expansions: self.expansions,
                visited_states,
                elapsed_ms: self.elapsed_ms() as f64,
            },
            breached: GuardBreaches {
                expansions: expansions_breached,
                visited_states: visited_states_breached,
                time_budget: time_budget_breached,
                any,
            },
        }
    }
}
