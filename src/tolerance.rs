//! `ToleranceWindow` and the cost-ceiling `ToleranceAmplifier` derived from
//! it (§4.4).

use crate::decimal::{Decimal, DecimalMath};
use crate::error::CoreError;
use std::cmp::Ordering;

/// The canonical scale tolerance values are normalized to.
pub const TOLERANCE_SCALE: u32 = 18;

/// Which bound a `ToleranceWindow`'s heuristic tolerance was drawn from.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize)]
pub enum ToleranceSource {
    Minimum,
    Maximum,
}

/// A `[minimum, maximum]` band of acceptable relative spend deviation, both
/// in `[0, 1)` at scale 18.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ToleranceWindow {
    minimum: Decimal,
    maximum: Decimal,
}

impl ToleranceWindow {
    pub fn new(minimum: Decimal, maximum: Decimal) -> Result<Self, CoreError> {
        let minimum = DecimalMath::normalize(&minimum, TOLERANCE_SCALE)?;
        let maximum = DecimalMath::normalize(&maximum, TOLERANCE_SCALE)?;
        let zero = Decimal::zero();
        let one = Decimal::one();
        for value in [&minimum, &maximum] {
            if DecimalMath::comp(value, &zero, TOLERANCE_SCALE)? == Ordering::Less
                || DecimalMath::comp(value, &one, TOLERANCE_SCALE)? != Ordering::Less
            {
                return Err(CoreError::invalid_input(format!(
                    "tolerance bound {} must be in [0, 1)",
                    value
                )));
            }
        }
        if DecimalMath::comp(&minimum, &maximum, TOLERANCE_SCALE)? == Ordering::Greater {
            return Err(CoreError::invalid_input(format!(
                "tolerance minimum {} must not exceed maximum {}",
                minimum, maximum
            )));
        }
        Ok(ToleranceWindow { minimum, maximum })
    }

    pub fn minimum(&self) -> &Decimal {
        &self.minimum
    }

    pub fn maximum(&self) -> &Decimal {
        &self.maximum
    }

    /// The single tolerance value used for cost-ceiling pruning: `maximum`
    /// when the window has width, else `minimum`.
    pub fn heuristic_tolerance(&self) -> Result<(Decimal, ToleranceSource), CoreError> {
        if DecimalMath::comp(&self.minimum, &self.maximum, TOLERANCE_SCALE)? == Ordering::Equal {
            Ok((self.minimum.clone(), ToleranceSource::Minimum))
        } else {
            Ok((self.maximum.clone(), ToleranceSource::Maximum))
        }
    }

    /// `1 / (1 - heuristicTolerance)` at scale 18, with the heuristic
    /// tolerance capped at `1 - 10^-18` so the amplifier is always defined.
    pub fn amplifier(&self) -> Result<Decimal, CoreError> {
        let (heuristic, _) = self.heuristic_tolerance()?;
        let near_one = DecimalMath::sub(&Decimal::one(), &Decimal::parse("1e-18", TOLERANCE_SCALE)?, TOLERANCE_SCALE)?;
        let capped = if DecimalMath::comp(&heuristic, &near_one, TOLERANCE_SCALE)? == Ordering::Greater {
            near_one
        } else {
            heuristic
        };
        if capped.is_zero() {
            return Ok(Decimal::one());
        }
        let denominator = DecimalMath::sub(&Decimal::one(), &capped, TOLERANCE_SCALE)?;
        DecimalMath::div(&Decimal::one(), &denominator, TOLERANCE_SCALE)
    }
}
