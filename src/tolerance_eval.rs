//! `ToleranceEvaluator`: accepts or rejects a materialized spend against the
//! caller's tolerance window, and reports the signed residual (§4.9).

use crate::decimal::{Decimal, DecimalMath};
use crate::error::CoreError;
use crate::money::Money;
use crate::tolerance::ToleranceWindow;
use std::cmp::Ordering;

#[derive(Clone, Copy, Debug, Default)]
pub struct ToleranceEvaluator;

impl ToleranceEvaluator {
    /// Returns the signed residual `(actual - desired) / desired` if
    /// `actual` falls within `window`, or `None` if it is rejected.
    pub fn evaluate(
        desired: &Money,
        actual: &Money,
        window: &ToleranceWindow,
    ) -> Result<Option<Decimal>, CoreError> {
        if desired.currency() != actual.currency() {
            return Err(CoreError::invalid_input(format!(
                "cannot evaluate tolerance between {} and {}",
                desired.currency(),
                actual.currency()
            )));
        }
        if desired.is_zero() {
            return Err(CoreError::invalid_input(
                "cannot evaluate tolerance against a zero desired amount",
            ));
        }

        let scale = desired.scale().max(actual.scale()).max(8) + 4;
        let difference = DecimalMath::sub(actual.amount(), desired.amount(), scale)?;
        let residual = DecimalMath::div(&difference, desired.amount(), scale)?;

        let comparison = actual.compare(desired, None)?;
        let magnitude = if residual.is_negative() {
            residual.negate()
        } else {
            residual.clone()
        };

        match comparison {
            Ordering::Less => {
                if DecimalMath::comp(&magnitude, window.minimum(), scale)? == Ordering::Greater {
                    return Ok(None);
                }
            }
            Ordering::Greater => {
                if DecimalMath::comp(&magnitude, window.maximum(), scale)? == Ordering::Greater {
                    return Ok(None);
                }
            }
            Ordering::Equal => {}
        }

        Ok(Some(residual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Currency;

    fn usd(amount: &str) -> Money {
        Money::new(Currency::new("USD").unwrap(), Decimal::parse(amount, 2).unwrap()).unwrap()
    }

    fn window(min: &str, max: &str) -> ToleranceWindow {
        ToleranceWindow::new(Decimal::parse(min, 18).unwrap(), Decimal::parse(max, 18).unwrap()).unwrap()
    }

    #[test]
    fn accepts_overspend_within_maximum() {
        let residual = ToleranceEvaluator::evaluate(&usd("100"), &usd("102"), &window("0.01", "0.05"))
            .unwrap()
            .unwrap();
        assert!(!residual.is_negative());
    }

    #[test]
    fn rejects_underspend_beyond_minimum() {
        let result = ToleranceEvaluator::evaluate(&usd("100"), &usd("90"), &window("0.01", "0.05")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn rejects_overspend_beyond_maximum() {
        let result = ToleranceEvaluator::evaluate(&usd("100"), &usd("120"), &window("0.01", "0.05")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn exact_match_has_zero_residual() {
        let residual = ToleranceEvaluator::evaluate(&usd("100"), &usd("100"), &window("0", "0"))
            .unwrap()
            .unwrap();
        assert!(residual.is_zero());
    }
}
