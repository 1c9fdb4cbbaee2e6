//! Deterministic, arbitrary-precision fixed-scale decimal arithmetic.
//!
//! The teacher crate (`pricegraph::num`) works entirely in `f64`, which is
//! appropriate for its estimate-only use case but cannot give the exact,
//! scale-explicit results this system needs (see `SPEC_FULL.md` §0). This
//! module replaces that `f64` facade with a `BigInt`-backed `Decimal` and a
//! stateless `DecimalMath` capability, in the same spirit as the teacher's
//! `num` module: free functions with no hidden global state, callable from
//! every value object's constructor.

use crate::error::CoreError;
use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, Zero};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Largest scale this crate will operate at. Matches §3's `0 ≤ scale ≤ 50`.
pub const MAX_SCALE: u32 = 50;

/// Upper bound on the *internal* working scale an operation may produce
/// before rounding down to the caller's requested scale (e.g. the combined
/// scale of a multiplication's operands). Exceeding this is a
/// `PrecisionViolation`, not an `InvalidInput`, since the inputs were each
/// individually valid.
const MAX_INTERNAL_SCALE: u32 = 400;

/// A signed arbitrary-precision decimal: `mantissa * 10^-scale`.
#[derive(Clone, Debug)]
pub struct Decimal {
    mantissa: BigInt,
    scale: u32,
}

impl Decimal {
    /// The additive identity at scale 0.
    pub fn zero() -> Self {
        Decimal {
            mantissa: BigInt::zero(),
            scale: 0,
        }
    }

    /// The multiplicative identity at scale 0.
    pub fn one() -> Self {
        Decimal {
            mantissa: BigInt::from(1),
            scale: 0,
        }
    }

    /// Builds a `Decimal` directly from a mantissa and scale, without
    /// rounding. Used internally and by callers who already hold an exact
    /// representation.
    pub fn from_parts(mantissa: BigInt, scale: u32) -> Result<Self, CoreError> {
        check_scale(scale)?;
        Ok(Decimal { mantissa, scale })
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn is_zero(&self) -> bool {
        self.mantissa.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.mantissa.is_positive()
    }

    /// Parses a decimal literal, accepting plain and scientific notation
    /// (`"1e-3"`, `"-4.20E2"`), and normalizes the result to `scale` using
    /// HALF_UP rounding.
    pub fn parse(input: &str, scale: u32) -> Result<Self, CoreError> {
        let exact = parse_exact(input)?;
        DecimalMath::normalize(&exact, scale)
    }

    /// Negates the value, preserving scale.
    pub fn negate(&self) -> Self {
        Decimal {
            mantissa: -&self.mantissa,
            scale: self.scale,
        }
    }

    /// Renders the decimal with trailing zeros preserved at its own scale,
    /// e.g. `Decimal::parse("1.5", 4)` renders as `"1.5000"`.
    pub fn to_canonical_string(&self) -> String {
        let negative = self.mantissa.is_negative();
        let digits = self.mantissa.abs().to_str_radix(10);
        let scale = self.scale as usize;

        let mut out = String::new();
        if negative && !self.mantissa.is_zero() {
            out.push('-');
        }
        if scale == 0 {
            out.push_str(&digits);
            return out;
        }

        if digits.len() <= scale {
            out.push_str("0.");
            out.push_str(&"0".repeat(scale - digits.len()));
            out.push_str(&digits);
        } else {
            let split = digits.len() - scale;
            out.push_str(&digits[..split]);
            out.push('.');
            out.push_str(&digits[split..]);
        }
        out
    }

    /// Lossy conversion to `f64`, used only for guard-report metrics and
    /// logging, never for arithmetic or comparisons that affect outcomes.
    pub fn to_f64_lossy(&self) -> f64 {
        let text = self.to_canonical_string();
        f64::from_str(&text).unwrap_or(f64::NAN)
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        DecimalMath::comp(self, other, self.scale.max(other.scale))
            .map(|o| o == Ordering::Equal)
            .unwrap_or(false)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl serde::Serialize for Decimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_canonical_string())
    }
}

fn check_scale(scale: u32) -> Result<(), CoreError> {
    if scale > MAX_SCALE {
        return Err(CoreError::invalid_input(format!(
            "scale {} exceeds maximum of {}",
            scale, MAX_SCALE
        )));
    }
    Ok(())
}

fn pow10(exponent: u32) -> BigInt {
    let mut result = BigInt::from(1);
    let ten = BigInt::from(10);
    for _ in 0..exponent {
        result *= &ten;
    }
    result
}

/// Divides `num` by `den` (both may be signed) and rounds the quotient
/// HALF_UP (ties round away from zero), per §4.1.
fn div_round_half_up(num: &BigInt, den: &BigInt) -> BigInt {
    debug_assert!(!den.is_zero());
    let negative = num.is_negative() ^ den.is_negative();
    let num_abs = num.abs();
    let den_abs = den.abs();
    let (quotient, remainder) = num_abs.div_rem(&den_abs);
    let doubled_remainder = &remainder * BigInt::from(2);
    let quotient = if doubled_remainder >= den_abs {
        quotient + BigInt::from(1)
    } else {
        quotient
    };
    if negative {
        -quotient
    } else {
        quotient
    }
}

/// Rescales a mantissa from `from_scale` to `to_scale`, rounding HALF_UP
/// when scaling down.
fn rescale_mantissa(mantissa: &BigInt, from_scale: u32, to_scale: u32) -> BigInt {
    if to_scale >= from_scale {
        mantissa * pow10(to_scale - from_scale)
    } else {
        div_round_half_up(mantissa, &pow10(from_scale - to_scale))
    }
}

/// Parses a plain or scientific-notation decimal literal into an exact
/// `Decimal` (no rounding is applied at parse time; rounding to the
/// requested scale is the caller's job via `DecimalMath::normalize`).
fn parse_exact(input: &str) -> Result<Decimal, CoreError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CoreError::invalid_input("empty decimal literal"));
    }

    let (mantissa_part, exponent) = match input.find(|c| c == 'e' || c == 'E') {
        Some(index) => {
            let (mantissa_part, exponent_part) = input.split_at(index);
            let exponent_part = &exponent_part[1..];
            let exponent = i64::from_str(exponent_part).map_err(|_| {
                CoreError::invalid_input(format!("invalid exponent in decimal {:?}", input))
            })?;
            (mantissa_part, exponent)
        }
        None => (input, 0),
    };

    let negative = mantissa_part.starts_with('-');
    let unsigned = mantissa_part
        .strip_prefix('-')
        .or_else(|| mantissa_part.strip_prefix('+'))
        .unwrap_or(mantissa_part);

    let (integer_part, fraction_part) = match unsigned.find('.') {
        Some(index) => (&unsigned[..index], &unsigned[index + 1..]),
        None => (unsigned, ""),
    };

    if integer_part.is_empty() && fraction_part.is_empty() {
        return Err(CoreError::invalid_input(format!(
            "invalid decimal literal {:?}",
            input
        )));
    }
    if !integer_part.chars().all(|c| c.is_ascii_digit())
        || !fraction_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(CoreError::invalid_input(format!(
            "non-numeric decimal literal {:?}",
            input
        )));
    }

    let digits = format!("{}{}", integer_part, fraction_part);
    let digits = if digits.is_empty() { "0" } else { digits.as_str() };
    let mantissa = BigInt::from_str(digits)
        .map_err(|_| CoreError::invalid_input(format!("invalid decimal literal {:?}", input)))?;
    let mantissa = if negative { -mantissa } else { mantissa };

    // value = mantissa * 10^-fraction_len * 10^exponent
    let scale_from_fraction = fraction_part.len() as i64;
    let net_scale = scale_from_fraction - exponent;

    let (mantissa, scale) = if net_scale >= 0 {
        (mantissa, net_scale as u32)
    } else {
        // Negative net scale means the exponent pushed the decimal point
        // further right than the literal had digits; pad with zeros instead
        // of representing a negative scale.
        let shift = (-net_scale) as u32;
        (mantissa * pow10(shift), 0)
    };

    Ok(Decimal { mantissa, scale })
}

/// Stateless decimal arithmetic capability. Modeled as a marker type with
/// associated functions rather than the teacher's process-wide static
/// facade (see `DESIGN.md`'s note on `num.rs`): there is no mutable global
/// state to swap, so every value object can call `DecimalMath::*` directly
/// and tests needing a different engine can implement the same signatures
/// against a stub without going through a singleton.
#[derive(Clone, Copy, Debug, Default)]
pub struct DecimalMath;

impl DecimalMath {
    /// Rescales `value` to `scale`, rounding HALF_UP when narrowing.
    pub fn normalize(value: &Decimal, scale: u32) -> Result<Decimal, CoreError> {
        check_scale(scale)?;
        let mantissa = rescale_mantissa(&value.mantissa, value.scale, scale);
        Ok(Decimal { mantissa, scale })
    }

    pub fn round(value: &Decimal, scale: u32) -> Result<Decimal, CoreError> {
        Self::normalize(value, scale)
    }

    pub fn add(lhs: &Decimal, rhs: &Decimal, scale: u32) -> Result<Decimal, CoreError> {
        check_scale(scale)?;
        let lhs = Self::normalize(lhs, scale)?;
        let rhs = Self::normalize(rhs, scale)?;
        Ok(Decimal {
            mantissa: lhs.mantissa + rhs.mantissa,
            scale,
        })
    }

    pub fn sub(lhs: &Decimal, rhs: &Decimal, scale: u32) -> Result<Decimal, CoreError> {
        check_scale(scale)?;
        let lhs = Self::normalize(lhs, scale)?;
        let rhs = Self::normalize(rhs, scale)?;
        Ok(Decimal {
            mantissa: lhs.mantissa - rhs.mantissa,
            scale,
        })
    }

    pub fn mul(lhs: &Decimal, rhs: &Decimal, scale: u32) -> Result<Decimal, CoreError> {
        check_scale(scale)?;
        let internal_scale = lhs.scale + rhs.scale;
        if internal_scale > MAX_INTERNAL_SCALE {
            return Err(CoreError::PrecisionViolation {
                operation: "mul".to_string(),
                scale: internal_scale,
            });
        }
        let product = &lhs.mantissa * &rhs.mantissa;
        let mantissa = rescale_mantissa(&product, internal_scale, scale);
        Ok(Decimal { mantissa, scale })
    }

    /// Divides `lhs` by `rhs`, rounding HALF_UP at `scale`. Division by zero
    /// is `InvalidInput`.
    pub fn div(lhs: &Decimal, rhs: &Decimal, scale: u32) -> Result<Decimal, CoreError> {
        check_scale(scale)?;
        if rhs.mantissa.is_zero() {
            return Err(CoreError::invalid_input("division by zero"));
        }
        // lhs/rhs = (Lm * 10^Rs * 10^s) / (10^Ls * Rm)
        let internal_scale = rhs.scale as u64 + scale as u64;
        if internal_scale > MAX_INTERNAL_SCALE as u64 {
            return Err(CoreError::PrecisionViolation {
                operation: "div".to_string(),
                scale: internal_scale as u32,
            });
        }
        let numerator = &lhs.mantissa * pow10(rhs.scale + scale);
        let denominator = &rhs.mantissa * pow10(lhs.scale);
        let mantissa = div_round_half_up(&numerator, &denominator);
        Ok(Decimal { mantissa, scale })
    }

    /// Compares two decimals after normalizing both to `scale`.
    pub fn comp(lhs: &Decimal, rhs: &Decimal, scale: u32) -> Result<Ordering, CoreError> {
        check_scale(scale)?;
        let lhs = Self::normalize(lhs, scale)?;
        let rhs = Self::normalize(rhs, scale)?;
        Ok(lhs.mantissa.cmp(&rhs.mantissa))
    }

    /// Picks a scale suitable for comparing two decimals of possibly
    /// different native scales: the larger of the two, or `fallback` if
    /// both are integral (scale 0), so comparisons of two whole numbers
    /// still get meaningful headroom when later combined with fractional
    /// values.
    pub fn scale_for_comparison(a: &Decimal, b: &Decimal, fallback: u32) -> u32 {
        if a.scale == 0 && b.scale == 0 {
            fallback
        } else {
            a.scale.max(b.scale)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str, scale: u32) -> Decimal {
        Decimal::parse(s, scale).unwrap()
    }

    #[test]
    fn parses_plain_and_scientific_notation() {
        assert_eq!(d("1.50", 4).to_canonical_string(), "1.5000");
        assert_eq!(d("1e-3", 6).to_canonical_string(), "0.001000");
        assert_eq!(d("-4.2E2", 2).to_canonical_string(), "-420.00");
        assert_eq!(d("0", 2).to_canonical_string(), "0.00");
    }

    #[test]
    fn rejects_non_numeric_and_bad_scale() {
        assert!(Decimal::parse("abc", 2).is_err());
        assert!(Decimal::parse("1.0", 51).is_err());
    }

    #[test]
    fn add_sub_are_exact_within_scale() {
        let a = d("1.1", 4);
        let b = d("2.2", 4);
        let sum = DecimalMath::add(&a, &b, 4).unwrap();
        assert_eq!(sum.to_canonical_string(), "3.3000");

        let diff = DecimalMath::sub(&b, &a, 4).unwrap();
        assert_eq!(diff.to_canonical_string(), "1.1000");
    }

    #[test]
    fn mul_rounds_half_up_at_requested_scale() {
        let a = d("1.005", 3);
        let b = d("2", 0);
        // exact product is 2.010, representable exactly at scale 2.
        let product = DecimalMath::mul(&a, &b, 2).unwrap();
        assert_eq!(product.to_canonical_string(), "2.01");
    }

    #[test]
    fn div_rounds_half_up_and_rejects_zero() {
        let one = d("1", 0);
        let three = d("3", 0);
        let result = DecimalMath::div(&one, &three, 4).unwrap();
        assert_eq!(result.to_canonical_string(), "0.3333");

        let zero = Decimal::zero();
        assert!(DecimalMath::div(&one, &zero, 4).is_err());
    }

    #[test]
    fn half_up_rounds_ties_away_from_zero() {
        let half = d("0.5", 1);
        let rounded = DecimalMath::normalize(&half, 0).unwrap();
        assert_eq!(rounded.to_canonical_string(), "1");

        let neg_half = d("-0.5", 1);
        let rounded = DecimalMath::normalize(&neg_half, 0).unwrap();
        assert_eq!(rounded.to_canonical_string(), "-1");
    }

    #[test]
    fn comp_orders_values_at_a_common_scale() {
        let a = d("1.1", 1);
        let b = d("1.10000", 5);
        assert_eq!(DecimalMath::comp(&a, &b, 5).unwrap(), Ordering::Equal);

        let c = d("1.2", 1);
        assert_eq!(DecimalMath::comp(&a, &c, 1).unwrap(), Ordering::Less);
    }
}
