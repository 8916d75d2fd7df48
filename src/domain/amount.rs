//! Raw token amounts and the integer <-> decimal-string codec.
//!
//! All ledger quantities are unsigned integers scaled by a per-token decimal
//! exponent. Arithmetic stays in U256; decimal strings exist only at the
//! presentation boundary and round-trip exactly.

use primitive_types::U256;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// A token amount in raw ledger units (pre decimal-point scaling).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawAmount(U256);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("invalid amount string: {0}")]
    Invalid(String),
    #[error("{value} has more fractional digits than the token's {decimals} decimals")]
    PrecisionLoss { value: String, decimals: u8 },
    #[error("amount out of range: {0}")]
    Overflow(String),
}

impl RawAmount {
    /// Create a RawAmount from a U256.
    pub fn new(value: U256) -> Self {
        RawAmount(value)
    }

    /// The additive identity (0).
    pub fn zero() -> Self {
        RawAmount(U256::zero())
    }

    /// Returns true if the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Get the underlying U256.
    pub fn as_u256(&self) -> U256 {
        self.0
    }

    /// Addition saturating at U256::MAX.
    pub fn saturating_add(self, rhs: RawAmount) -> RawAmount {
        RawAmount(self.0.saturating_add(rhs.0))
    }

    /// Subtraction clamped at zero.
    pub fn saturating_sub(self, rhs: RawAmount) -> RawAmount {
        RawAmount(self.0.saturating_sub(rhs.0))
    }

    /// The smaller of the two amounts.
    pub fn min(self, rhs: RawAmount) -> RawAmount {
        if self.0 <= rhs.0 {
            self
        } else {
            rhs
        }
    }

    /// Parse a human decimal string into raw units for a token with the given
    /// decimals. Pure integer arithmetic; fractional digits beyond the token's
    /// precision are an error rather than silently rounded.
    pub fn from_decimal_str(s: &str, decimals: u8) -> Result<Self, AmountError> {
        let s = s.trim();
        if s.is_empty() || s.starts_with('-') {
            return Err(AmountError::Invalid(s.to_string()));
        }

        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(AmountError::Invalid(s.to_string()));
        }
        if !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(AmountError::Invalid(s.to_string()));
        }

        let decimals_usize = decimals as usize;
        let significant_frac = frac_part.trim_end_matches('0');
        if significant_frac.len() > decimals_usize {
            return Err(AmountError::PrecisionLoss {
                value: s.to_string(),
                decimals,
            });
        }

        // Raw value is the concatenation of the integer digits and the
        // fractional digits right-padded to the token's precision.
        let mut digits = String::with_capacity(int_part.len() + decimals_usize);
        digits.push_str(int_part);
        digits.push_str(significant_frac);
        for _ in significant_frac.len()..decimals_usize {
            digits.push('0');
        }
        if digits.is_empty() {
            digits.push('0');
        }

        U256::from_dec_str(&digits)
            .map(RawAmount)
            .map_err(|_| AmountError::Overflow(s.to_string()))
    }

    /// Format raw units as an exact human decimal string.
    ///
    /// Integer div/rem by 10^decimals; the fractional part is zero-padded to
    /// the token's precision and right-trimmed. Non-zero digits are never
    /// truncated, so dust amounts far below 10^-4 of a unit still render.
    pub fn to_decimal_string(&self, decimals: u8) -> String {
        if decimals == 0 {
            return self.0.to_string();
        }
        let (int_part, remainder) = match pow10(decimals as u32) {
            Some(divisor) => (self.0 / divisor, self.0 % divisor),
            // 10^decimals exceeds U256: the whole value is fractional.
            None => (U256::zero(), self.0),
        };
        if remainder.is_zero() {
            return int_part.to_string();
        }
        let mut frac = remainder.to_string();
        while frac.len() < decimals as usize {
            frac.insert(0, '0');
        }
        let frac = frac.trim_end_matches('0');
        format!("{}.{}", int_part, frac)
    }

    /// Rescale between token precisions with floor semantics.
    ///
    /// Returns None when scaling up overflows U256.
    pub fn rescale(self, from_decimals: u8, to_decimals: u8) -> Option<RawAmount> {
        if from_decimals == to_decimals {
            return Some(self);
        }
        if to_decimals > from_decimals {
            let factor = pow10((to_decimals - from_decimals) as u32)?;
            self.0.checked_mul(factor).map(RawAmount)
        } else {
            let factor = pow10((from_decimals - to_decimals) as u32)?;
            Some(RawAmount(self.0 / factor))
        }
    }
}

/// 10^exp, or None past U256 range.
fn pow10(exp: u32) -> Option<U256> {
    let ten = U256::from(10u64);
    let mut acc = U256::one();
    for _ in 0..exp {
        acc = acc.checked_mul(ten)?;
    }
    Some(acc)
}

/// Utilization of a limit in basis points, floor-rounded integer math.
///
/// A zero limit yields zero rather than a division error.
pub fn utilization_bps(used: RawAmount, limit: RawAmount) -> u32 {
    if limit.is_zero() {
        return 0;
    }
    let bps_scale = U256::from(10_000u64);
    let whole = (used.0 / limit.0).saturating_mul(bps_scale);
    let part = used.0 % limit.0;
    let bps = whole.saturating_add(part.saturating_mul(bps_scale) / limit.0);
    if bps > U256::from(u32::MAX) {
        u32::MAX
    } else {
        bps.as_u32()
    }
}

impl fmt::Display for RawAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RawAmount {
    fn from(value: u64) -> Self {
        RawAmount(U256::from(value))
    }
}

impl From<u128> for RawAmount {
    fn from(value: u128) -> Self {
        RawAmount(U256::from(value))
    }
}

impl From<U256> for RawAmount {
    fn from(value: U256) -> Self {
        RawAmount(value)
    }
}

// Serialized as raw-unit decimal strings: JSON numbers cannot carry 256-bit
// integers without loss, and hex would leak transport encoding into the API.
impl Serialize for RawAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for RawAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_dec_str(&s)
            .map(RawAmount)
            .map_err(|_| de::Error::custom(format!("invalid raw amount: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(v: u128) -> RawAmount {
        RawAmount::from(v)
    }

    #[test]
    fn test_roundtrip_representable_integers() {
        for decimals in [0u8, 6, 18] {
            for v in [0u128, 1, 7, 400_000, 600_000, 1_000_000, u64::MAX as u128] {
                let amount = raw(v);
                let s = amount.to_decimal_string(decimals);
                let reparsed = RawAmount::from_decimal_str(&s, decimals).expect("reparse failed");
                assert_eq!(amount, reparsed, "roundtrip failed for {} at {} dp", v, decimals);
            }
        }
    }

    #[test]
    fn test_format_six_decimals() {
        assert_eq!(raw(600_000).to_decimal_string(6), "0.6");
        assert_eq!(raw(1_000_000).to_decimal_string(6), "1");
        assert_eq!(raw(1_500_000).to_decimal_string(6), "1.5");
        assert_eq!(raw(1).to_decimal_string(6), "0.000001");
    }

    #[test]
    fn test_format_dust_retains_all_digits() {
        // 1 wei at 18 decimals: far below 10^-4 of a unit, must not render as "0".
        assert_eq!(raw(1).to_decimal_string(18), "0.000000000000000001");
        assert_eq!(raw(1_000_000).to_decimal_string(18), "0.000000000001");
    }

    #[test]
    fn test_parse_decimal_strings() {
        assert_eq!(RawAmount::from_decimal_str("1.5", 6).unwrap(), raw(1_500_000));
        assert_eq!(RawAmount::from_decimal_str("0.6", 6).unwrap(), raw(600_000));
        assert_eq!(RawAmount::from_decimal_str("42", 0).unwrap(), raw(42));
        assert_eq!(RawAmount::from_decimal_str(".5", 6).unwrap(), raw(500_000));
        assert_eq!(
            RawAmount::from_decimal_str("1.50000000", 6).unwrap(),
            raw(1_500_000),
            "trailing zeros beyond precision are not significant"
        );
    }

    #[test]
    fn test_parse_rejects_precision_loss() {
        let err = RawAmount::from_decimal_str("0.1234567", 6).unwrap_err();
        assert!(matches!(err, AmountError::PrecisionLoss { decimals: 6, .. }));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for s in ["", "-1", "1.2.3", "abc", ".", "1e6"] {
            assert!(
                RawAmount::from_decimal_str(s, 6).is_err(),
                "expected parse failure for {:?}",
                s
            );
        }
    }

    #[test]
    fn test_utilization_floor_division() {
        assert_eq!(utilization_bps(raw(1), raw(3)), 3333);
        assert_eq!(utilization_bps(raw(500_000), raw(1_000_000)), 5000);
        assert_eq!(utilization_bps(raw(1_000_000), raw(1_000_000)), 10_000);
        assert_eq!(utilization_bps(raw(0), raw(1_000_000)), 0);
    }

    #[test]
    fn test_utilization_zero_limit() {
        assert_eq!(utilization_bps(raw(5), RawAmount::zero()), 0);
    }

    #[test]
    fn test_saturating_sub_clamps_at_zero() {
        assert_eq!(raw(5).saturating_sub(raw(9)), RawAmount::zero());
        assert_eq!(raw(9).saturating_sub(raw(5)), raw(4));
    }

    #[test]
    fn test_rescale() {
        assert_eq!(raw(1_000_000).rescale(6, 18).unwrap(), raw(10u128.pow(18)));
        assert_eq!(raw(10u128.pow(18)).rescale(18, 6).unwrap(), raw(1_000_000));
        assert_eq!(raw(7).rescale(6, 6).unwrap(), raw(7));
        // Floor on downscale.
        assert_eq!(raw(1_999_999).rescale(6, 0).unwrap(), raw(1));
    }

    #[test]
    fn test_serde_decimal_string() {
        let amount = raw(600_000);
        let json = serde_json::to_string(&amount).unwrap();
        assert_eq!(json, "\"600000\"");
        let back: RawAmount = serde_json::from_str(&json).unwrap();
        assert_eq!(back, amount);
    }
}
