//! Trove: one borrower's collateralized debt position.

use super::primitives::Address;
use super::uint::{serde_u256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a trove.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TroveStatus {
    Active,
    Closed,
    Liquidated,
    Redeemed,
}

impl TroveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TroveStatus::Active => "active",
            TroveStatus::Closed => "closed",
            TroveStatus::Liquidated => "liquidated",
            TroveStatus::Redeemed => "redeemed",
        }
    }

    /// Closed and liquidated troves never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TroveStatus::Closed | TroveStatus::Liquidated)
    }
}

impl fmt::Display for TroveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TroveStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TroveStatus::Active),
            "closed" => Ok(TroveStatus::Closed),
            "liquidated" => Ok(TroveStatus::Liquidated),
            "redeemed" => Ok(TroveStatus::Redeemed),
            other => Err(format!("unknown trove status: {}", other)),
        }
    }
}

/// Persisted trove record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trove {
    /// `collId:normalizedTroveId`.
    pub id: String,
    pub trove_id: Address,
    pub collateral_id: String,
    pub borrower: Address,
    pub previous_owner: Option<Address>,
    #[serde(with = "serde_u256")]
    pub debt: U256,
    #[serde(with = "serde_u256")]
    pub deposit: U256,
    #[serde(with = "serde_u256")]
    pub stake: U256,
    /// Zero while the trove is batch-managed.
    #[serde(with = "serde_u256")]
    pub interest_rate: U256,
    /// `collId:batchManager` while batch-managed.
    pub interest_batch: Option<String>,
    pub status: TroveStatus,
    pub created_at: u64,
    pub updated_at: u64,
    pub closed_at: Option<u64>,
    pub last_user_action_at: u64,
    pub redemption_count: u32,
    #[serde(with = "serde_u256")]
    pub redeemed_coll: U256,
    #[serde(with = "serde_u256")]
    pub redeemed_debt: U256,
    pub might_be_leveraged: bool,
    /// Transaction that last set `might_be_leveraged`.
    pub leverage_tx_hash: Option<String>,
}

impl Trove {
    pub fn is_batch_managed(&self) -> bool {
        self.interest_batch.is_some()
    }

    /// Exactly one of (non-zero rate, batch membership) for live troves.
    pub fn rate_source_is_exclusive(&self) -> bool {
        if self.status.is_terminal() {
            return true;
        }
        self.interest_rate.is_zero() == self.interest_batch.is_some()
    }
}

/// Composite id of a trove within its branch.
pub fn trove_full_id(collateral_id: &str, trove_id: &Address) -> String {
    format!("{}:{}", collateral_id, trove_id)
}

/// Composite id of an interest batch within its branch.
pub fn batch_full_id(collateral_id: &str, batch_manager: &Address) -> String {
    format!("{}:{}", collateral_id, batch_manager)
}
