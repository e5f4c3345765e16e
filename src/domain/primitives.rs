//! Domain primitives: canonical chain addresses and block context.

use super::uint::{parse_u256, U256};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Canonical chain address: lowercase, `0x`-prefixed, 64 hex digits.
///
/// Every composite entity id is built from this form, so two spellings of the
/// same felt (`0x1`, `0x0001`, `1`) always produce the same id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Address(String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid address: {0}")]
pub struct AddressParseError(pub String);

impl Address {
    /// The zero address used as mint/burn sentinel.
    pub fn zero() -> Self {
        Address::from(U256::zero())
    }

    /// Parse and normalize a hex (`0x...`) or decimal address literal.
    pub fn parse(raw: &str) -> Result<Self, AddressParseError> {
        parse_u256(raw)
            .map(Address::from)
            .map_err(|_| AddressParseError(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.bytes().skip(2).all(|b| b == b'0')
    }

    /// Numeric value of the address, used as call data.
    pub fn to_u256(&self) -> U256 {
        // The stored form is always 64 valid hex digits.
        U256::from_str_radix(&self.0[2..], 16).unwrap_or_default()
    }
}

/// Normalize any numeric address to its canonical hex form.
pub fn to_hex_address(value: U256) -> String {
    format!("0x{:0>64}", format!("{:x}", value))
}

impl From<U256> for Address {
    fn from(value: U256) -> Self {
        Address(to_hex_address(value))
    }
}

impl From<u64> for Address {
    fn from(value: u64) -> Self {
        Address::from(U256::from(value))
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = super::uint::serde_u256::deserialize(deserializer)?;
        Ok(Address::from(value))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Block in which an event was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub number: u64,
    /// Seconds since Unix epoch.
    pub timestamp: u64,
}
