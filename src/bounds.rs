//! `OrderBounds`: the min/max base-amount fill range of an order.

use crate::error::CoreError;
use crate::money::Money;
use std::cmp::Ordering;

/// Inclusive `[min, max]` base-amount bounds for an order's fill.
#[derive(Clone, Debug, serde::Serialize)]
pub struct OrderBounds {
    min: Money,
    max: Money,
}

impl OrderBounds {
    pub fn new(min: Money, max: Money) -> Result<Self, CoreError> {
        if min.currency() != max.currency() {
            return Err(CoreError::invalid_input(format!(
                "order bounds currency mismatch: {} vs {}",
                min.currency(),
                max.currency()
            )));
        }
        if min.compare(&max, None)? == Ordering::Greater {
            return Err(CoreError::invalid_input(format!(
                "order bounds min ({}) must not exceed max ({})",
                min, max
            )));
        }
        Ok(OrderBounds { min, max })
    }

    pub fn min(&self) -> &Money {
        &self.min
    }

    pub fn max(&self) -> &Money {
        &self.max
    }

    /// Returns `true` iff `amount` falls within `[min, max]` inclusive.
    pub fn contains(&self, amount: &Money) -> Result<bool, CoreError> {
        if amount.currency() != self.min.currency() {
            return Err(CoreError::invalid_input(format!(
                "cannot test containment of {} against bounds in {}",
                amount.currency(),
                self.min.currency()
            )));
        }
        let not_below = amount.compare(&self.min, None)? != Ordering::Less;
        let not_above = amount.compare(&self.max, None)? != Ordering::Greater;
        Ok(not_below && not_above)
    }

    /// Clamps `amount` into `[min, max]`.
    pub fn clamp_to_bounds(&self, amount: &Money) -> Result<Money, CoreError> {
        if amount.compare(&self.min, None)? == Ordering::Less {
            return Ok(self.min.clone());
        }
        if amount.compare(&self.max, None)? == Ordering::Greater {
            return Ok(self.max.clone());
        }
        Ok(amount.clone())
    }
}
