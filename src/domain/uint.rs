//! Lossless 256-bit unsigned integers as they appear on chain.
//!
//! Amounts, rates and stakes are 18-decimal fixed point values. They are
//! persisted as canonical decimal strings and accepted from event payloads as
//! decimal strings, `0x` hex strings or plain JSON numbers.

pub use primitive_types::U256;

use thiserror::Error;

/// One unit in 18-decimal fixed point (1e18).
pub const DECIMAL_PRECISION: u64 = 1_000_000_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UintParseError {
    #[error("empty integer literal")]
    Empty,
    #[error("invalid integer literal: {0}")]
    Invalid(String),
}

/// Parse a decimal or `0x`-prefixed hex literal into a U256.
pub fn parse_u256(s: &str) -> Result<U256, UintParseError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(UintParseError::Empty);
    }

    if let Some(hex_digits) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if hex_digits.is_empty() || hex_digits.len() > 64 {
            return Err(UintParseError::Invalid(s.to_string()));
        }
        return U256::from_str_radix(hex_digits, 16)
            .map_err(|_| UintParseError::Invalid(s.to_string()));
    }

    if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UintParseError::Invalid(s.to_string()));
    }
    U256::from_dec_str(trimmed).map_err(|_| UintParseError::Invalid(s.to_string()))
}

/// Format a U256 as its canonical decimal string.
pub fn to_canonical_string(value: &U256) -> String {
    value.to_string()
}

/// `10^exp` as a U256.
pub fn pow10(exp: usize) -> U256 {
    U256::exp10(exp)
}

/// Serde adapter: serializes as a decimal string, deserializes from a decimal
/// string, a hex string or a JSON integer.
pub mod serde_u256 {
    use super::{parse_u256, U256};
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(U256Visitor)
    }

    struct U256Visitor;

    impl<'de> Visitor<'de> for U256Visitor {
        type Value = U256;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a decimal string, a 0x hex string or an unsigned integer")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<U256, E> {
            Ok(U256::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<U256, E> {
            u64::try_from(v)
                .map(U256::from)
                .map_err(|_| E::custom("negative value for unsigned integer"))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<U256, E> {
            parse_u256(v).map_err(E::custom)
        }
    }
}
