//! `SpendRange` and `SpendConstraints`: propagable spend intervals carried
//! through the search (§4.5, §4.7.7).

use crate::error::CoreError;
use crate::money::Money;
use std::cmp::Ordering;

/// A `[min, max]` amount range in a single currency. Inverted bounds are
/// swapped rather than rejected, since ranges synthesized from edge
/// interpolation (§4.7.7) may arrive either way round.
#[derive(Clone, Debug, serde::Serialize)]
pub struct SpendRange {
    min: Money,
    max: Money,
}

impl SpendRange {
    pub fn new(a: Money, b: Money) -> Result<Self, CoreError> {
        if a.currency() != b.currency() {
            return Err(CoreError::invalid_input(format!(
                "spend range currency mismatch: {} vs {}",
                a.currency(),
                b.currency()
            )));
        }
        let (min, max) = if a.compare(&b, None)? == Ordering::Greater {
            (b, a)
        } else {
            (a, b)
        };
        Ok(SpendRange { min, max })
    }

    pub fn min(&self) -> &Money {
        &self.min
    }

    pub fn max(&self) -> &Money {
        &self.max
    }

    pub fn is_zero_width(&self) -> Result<bool, CoreError> {
        Ok(self.min.compare(&self.max, None)? == Ordering::Equal)
    }

    /// Returns the clamped intersection with `other`, or `None` if disjoint.
    pub fn intersect(&self, other: &SpendRange) -> Result<Option<SpendRange>, CoreError> {
        if self.min.currency() != other.min.currency() {
            return Err(CoreError::invalid_input(format!(
                "cannot intersect spend ranges in {} and {}",
                self.min.currency(),
                other.min.currency()
            )));
        }
        if other.max.compare(&self.min, None)? == Ordering::Less {
            return Ok(None);
        }
        if other.min.compare(&self.max, None)? == Ordering::Greater {
            return Ok(None);
        }
        let min = if self.min.compare(&other.min, None)? == Ordering::Greater {
            self.min.clone()
        } else {
            other.min.clone()
        };
        let max = if self.max.compare(&other.max, None)? == Ordering::Less {
            self.max.clone()
        } else {
            other.max.clone()
        };
        Ok(Some(SpendRange::new(min, max)?))
    }

    /// Clamps `value` into `[min, max]`.
    pub fn clamp(&self, value: &Money) -> Result<Money, CoreError> {
        if value.compare(&self.min, None)? == Ordering::Less {
            return Ok(self.min.clone());
        }
        if value.compare(&self.max, None)? == Ordering::Greater {
            return Ok(self.max.clone());
        }
        Ok(value.clone())
    }

    /// Lifts both bounds to `max(self.scale, money.scale)`.
    pub fn normalize_with(&self, money: &Money) -> Result<SpendRange, CoreError> {
        let scale = self.min.scale().max(money.scale());
        SpendRange::new(self.min.with_scale(scale)?, self.max.with_scale(scale)?)
    }
}

/// The search's caller-supplied spend window: a `[min, max]` band plus an
/// optional desired amount that may fall outside it (§4.5).
#[derive(Clone, Debug, serde::Serialize)]
pub struct SpendConstraints {
    min: Money,
    max: Money,
    desired: Option<Money>,
}

impl SpendConstraints {
    pub fn new(min: Money, max: Money, desired: Option<Money>) -> Result<Self, CoreError> {
        let range = SpendRange::new(min.clone(), max.clone())?;
        if let Some(desired) = &desired {
            if desired.currency() != range.min().currency() {
                return Err(CoreError::invalid_input(format!(
                    "desired spend currency {} does not match constraint currency {}",
                    desired.currency(),
                    range.min().currency()
                )));
            }
        }
        Ok(SpendConstraints {
            min: range.min().clone(),
            max: range.max().clone(),
            desired,
        })
    }

    pub fn min(&self) -> &Money {
        &self.min
    }

    pub fn max(&self) -> &Money {
        &self.max
    }

    pub fn desired(&self) -> Option<&Money> {
        self.desired.as_ref()
    }

    pub fn range(&self) -> Result<SpendRange, CoreError> {
        SpendRange::new(self.min.clone(), self.max.clone())
    }

    /// The desired amount clamped into `[min, max]`, defaulting to `min`
    /// when no desired amount was supplied.
    pub fn effective_desired(&self) -> Result<Money, CoreError> {
        let range = self.range()?;
        match &self.desired {
            Some(desired) => range.clamp(desired),
            None => Ok(self.min.clone()),
        }
    }
}
