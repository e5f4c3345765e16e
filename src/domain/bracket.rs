//! Interest-rate brackets and interest batches.

use super::accrual::DebtAccumulator;
use super::primitives::Address;
use super::uint::{pow10, serde_u256, U256};
use serde::{Deserialize, Serialize};

/// Decimals kept when flooring a rate to its bracket.
pub const RATE_BRACKET_DECIMALS: usize = 3;

/// Floor an 18-decimal value to `decimals` decimals.
pub fn floor_to_decimals(value: U256, decimals: usize) -> U256 {
    let factor = pow10(18usize.saturating_sub(decimals));
    (value / factor) * factor
}

/// Floored rate identifying the bracket an exact rate belongs to.
pub fn bracket_rate(rate: U256) -> U256 {
    floor_to_decimals(rate, RATE_BRACKET_DECIMALS)
}

/// `collId:flooredRate`.
pub fn bracket_id(collateral_id: &str, floored_rate: U256) -> String {
    format!("{}:{}", collateral_id, floored_rate)
}

/// Aggregate of all non-batched troves of a branch whose rate floors to `rate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestRateBracket {
    pub id: String,
    pub collateral_id: String,
    #[serde(with = "serde_u256")]
    pub rate: U256,
    #[serde(flatten)]
    pub accrual: DebtAccumulator,
}

impl InterestRateBracket {
    pub fn new(collateral_id: &str, floored_rate: U256, at: u64) -> Self {
        InterestRateBracket {
            id: bracket_id(collateral_id, floored_rate),
            collateral_id: collateral_id.to_string(),
            rate: floored_rate,
            accrual: DebtAccumulator::new(at),
        }
    }
}

/// Troves sharing one manager-controlled rate.
///
/// The batch's debt is `accrual.total_debt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterestBatch {
    pub id: String,
    pub collateral_id: String,
    pub batch_manager: Address,
    #[serde(with = "serde_u256")]
    pub coll: U256,
    #[serde(with = "serde_u256")]
    pub annual_interest_rate: U256,
    #[serde(with = "serde_u256")]
    pub annual_management_fee: U256,
    #[serde(flatten)]
    pub accrual: DebtAccumulator,
}

impl InterestBatch {
    pub fn new(id: String, collateral_id: &str, batch_manager: Address, at: u64) -> Self {
        InterestBatch {
            id,
            collateral_id: collateral_id.to_string(),
            batch_manager,
            coll: U256::zero(),
            annual_interest_rate: U256::zero(),
            annual_management_fee: U256::zero(),
            accrual: DebtAccumulator::new(at),
        }
    }

    pub fn debt(&self) -> U256 {
        self.accrual.total_debt
    }
}
