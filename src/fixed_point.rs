// 2.0: 18 decimal fixed point over a 256 bit integer. every collateral amount, token amount,
// price and percentage in the engine is one of these. raw value 1 is 1e-18.
// mul/div truncate. the _ceil variants round up and are only used where the accounting
// layer wants the error to land on the protocol's side.

use primitive_types::U256;
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const DECIMALS: u32 = 18;
const SCALE: u64 = 1_000_000_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    #[error("fixed point overflow")]
    Overflow,
    #[error("fixed point underflow")]
    Underflow,
    #[error("division by zero")]
    DivisionByZero,
    #[error("invalid fixed point literal: {0}")]
    InvalidLiteral(String),
}

fn scale() -> U256 {
    U256::from(SCALE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FixedPoint(U256);

impl FixedPoint {
    pub const ZERO: FixedPoint = FixedPoint(U256([0, 0, 0, 0]));
    pub const ONE: FixedPoint = FixedPoint(U256([SCALE, 0, 0, 0]));

    pub fn from_raw(raw: U256) -> Self {
        Self(raw)
    }

    pub fn from_raw_u128(raw: u128) -> Self {
        Self(U256::from(raw))
    }

    /// Whole units, e.g. `from_unscaled(150)` is 150.0. Cannot overflow: u64 * 1e18 fits in 128 bits.
    pub fn from_unscaled(units: u64) -> Self {
        Self(U256::from(units) * scale())
    }

    /// Exact conversion for up to 18 decimal places, extra places truncate. Negative values are rejected.
    pub fn from_decimal(value: Decimal) -> Result<Self, MathError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(MathError::Underflow);
        }
        let mantissa = U256::from(value.mantissa().unsigned_abs());
        let value_scale = value.scale();
        let raw = if value_scale <= DECIMALS {
            let factor = U256::exp10((DECIMALS - value_scale) as usize);
            mantissa.checked_mul(factor).ok_or(MathError::Overflow)?
        } else {
            mantissa / U256::exp10((value_scale - DECIMALS) as usize)
        };
        Ok(Self(raw))
    }

    /// `None` when the value does not fit in a Decimal's 96 bit mantissa.
    pub fn to_decimal(&self) -> Option<Decimal> {
        if self.0 > U256::from(i128::MAX as u128) {
            return None;
        }
        let raw = i128::try_from(self.0.low_u128()).ok()?;
        Decimal::try_from_i128_with_scale(raw, DECIMALS)
            .ok()
            .map(|d| d.normalize())
    }

    pub fn raw(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn add(&self, other: FixedPoint) -> Result<Self, MathError> {
        self.0.checked_add(other.0).map(Self).ok_or(MathError::Overflow)
    }

    pub fn sub(&self, other: FixedPoint) -> Result<Self, MathError> {
        self.0.checked_sub(other.0).map(Self).ok_or(MathError::Underflow)
    }

    // clamps at zero. only for "max(0, a - b)" style quantities.
    pub fn saturating_sub(&self, other: FixedPoint) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn mul(&self, other: FixedPoint) -> Result<Self, MathError> {
        let product = self.0.checked_mul(other.0).ok_or(MathError::Overflow)?;
        Ok(Self(product / scale()))
    }

    pub fn mul_ceil(&self, other: FixedPoint) -> Result<Self, MathError> {
        let product = self.0.checked_mul(other.0).ok_or(MathError::Overflow)?;
        let (quotient, remainder) = product.div_mod(scale());
        round_up(quotient, remainder)
    }

    /// Multiply by a plain integer, e.g. elapsed seconds. Exact.
    pub fn mul_unscaled(&self, factor: u64) -> Result<Self, MathError> {
        self.0
            .checked_mul(U256::from(factor))
            .map(Self)
            .ok_or(MathError::Overflow)
    }

    pub fn div(&self, other: FixedPoint) -> Result<Self, MathError> {
        if other.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        let numerator = self.0.checked_mul(scale()).ok_or(MathError::Overflow)?;
        Ok(Self(numerator / other.0))
    }

    pub fn div_ceil(&self, other: FixedPoint) -> Result<Self, MathError> {
        if other.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        let numerator = self.0.checked_mul(scale()).ok_or(MathError::Overflow)?;
        let (quotient, remainder) = numerator.div_mod(other.0);
        round_up(quotient, remainder)
    }
}

fn round_up(quotient: U256, remainder: U256) -> Result<FixedPoint, MathError> {
    if remainder.is_zero() {
        Ok(FixedPoint(quotient))
    } else {
        quotient
            .checked_add(U256::one())
            .map(FixedPoint)
            .ok_or(MathError::Overflow)
    }
}

impl fmt::Display for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (whole, frac) = self.0.div_mod(scale());
        if frac.is_zero() {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:0>18}", frac.to_string());
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl FromStr for FixedPoint {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MathError::InvalidLiteral(s.to_string());
        let (whole, frac) = match s.split_once('.') {
            Some((whole, frac)) => (whole, frac),
            None => (s, ""),
        };
        if whole.is_empty() || frac.len() > DECIMALS as usize {
            return Err(invalid());
        }
        if !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let whole = U256::from_dec_str(whole).map_err(|_| invalid())?;
        let frac = if frac.is_empty() {
            U256::zero()
        } else {
            let padded = format!("{:0<18}", frac);
            U256::from_dec_str(&padded).map_err(|_| invalid())?
        };
        let raw = whole
            .checked_mul(scale())
            .and_then(|w| w.checked_add(frac))
            .ok_or(MathError::Overflow)?;
        Ok(Self(raw))
    }
}

impl Serialize for FixedPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FixedPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl From<u64> for FixedPoint {
    fn from(units: u64) -> Self {
        Self::from_unscaled(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fp(s: &str) -> FixedPoint {
        s.parse().unwrap()
    }

    #[test]
    fn mul_truncates_and_mul_ceil_rounds_up() {
        let a = FixedPoint::from_raw_u128(30);
        let rate = fp("0.04");
        // 30 wei * 0.04 = 1.2 wei
        assert_eq!(a.mul(rate).unwrap(), FixedPoint::from_raw_u128(1));
        assert_eq!(a.mul_ceil(rate).unwrap(), FixedPoint::from_raw_u128(2));
        assert_eq!(fp("1.5").mul(fp("2")).unwrap(), fp("3"));
    }

    #[test]
    fn div_truncates_and_div_ceil_rounds_up() {
        let one_wei = FixedPoint::from_raw_u128(1);
        let thirty_wei = FixedPoint::from_raw_u128(30);
        assert_eq!(one_wei.div(thirty_wei).unwrap(), fp("0.033333333333333333"));
        assert_eq!(one_wei.div_ceil(thirty_wei).unwrap(), fp("0.033333333333333334"));
        assert_eq!(fp("150").div(fp("100")).unwrap(), fp("1.5"));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(FixedPoint::ONE.div(FixedPoint::ZERO), Err(MathError::DivisionByZero));
        assert_eq!(FixedPoint::ONE.div_ceil(FixedPoint::ZERO), Err(MathError::DivisionByZero));
    }

    #[test]
    fn overflow_and_underflow_are_errors() {
        let max = FixedPoint::from_raw(U256::MAX);
        assert_eq!(max.add(FixedPoint::from_raw_u128(1)), Err(MathError::Overflow));
        assert_eq!(max.mul(fp("2")), Err(MathError::Overflow));
        assert_eq!(FixedPoint::ZERO.sub(FixedPoint::ONE), Err(MathError::Underflow));
        assert_eq!(FixedPoint::ZERO.saturating_sub(FixedPoint::ONE), FixedPoint::ZERO);
    }

    #[test]
    fn parse_and_display() {
        assert_eq!(fp("0.966666666666666666").to_string(), "0.966666666666666666");
        assert_eq!(fp("150").to_string(), "150");
        assert_eq!(fp("1.10").to_string(), "1.1");
        assert_eq!(FixedPoint::from_raw_u128(1).to_string(), "0.000000000000000001");
        assert!("1.0000000000000000001".parse::<FixedPoint>().is_err());
        assert!("-1".parse::<FixedPoint>().is_err());
        assert!(".5".parse::<FixedPoint>().is_err());
    }

    #[test]
    fn decimal_conversion() {
        assert_eq!(FixedPoint::from_decimal(dec!(1.2)).unwrap(), fp("1.2"));
        assert_eq!(FixedPoint::from_decimal(dec!(150)).unwrap(), FixedPoint::from_unscaled(150));
        assert_eq!(FixedPoint::from_decimal(dec!(-1)), Err(MathError::Underflow));
        assert_eq!(fp("0.05").to_decimal(), Some(dec!(0.05)));
    }

    #[test]
    fn serde_uses_decimal_strings() {
        let json = serde_json::to_string(&fp("1.5")).unwrap();
        assert_eq!(json, "\"1.5\"");
        let back: FixedPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp("1.5"));
    }
}
