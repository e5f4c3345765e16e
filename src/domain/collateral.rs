//! Collateral branches and the contract sources registered for them.

use super::primitives::Address;
use super::uint::{serde_u256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One independently parameterized market (one collateral asset).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collateral {
    /// Branch index as decimal string.
    pub id: String,
    pub coll_index: u32,
    #[serde(with = "serde_u256")]
    pub min_coll_ratio: U256,
    pub created_at_block: u64,
}

impl Collateral {
    pub fn id_for_index(coll_index: u32) -> String {
        coll_index.to_string()
    }
}

/// Contracts deployed for one branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollateralAddresses {
    pub id: String,
    pub collateral_id: String,
    pub token: Address,
    pub borrower_operations: Address,
    pub sorted_troves: Address,
    pub stability_pool: Address,
    pub trove_manager: Address,
    pub trove_nft: Address,
    pub trove_manager_events_emitter: Address,
    pub liquidation_manager: Address,
    pub redemption_manager: Address,
    pub batch_manager: Address,
}

/// Template a contract's events are consumed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceTemplate {
    /// Stablecoin contract emitting collateral-registry changes.
    Usdu,
    TroveManagerEventsEmitter,
    TroveNft,
    BatchManager,
    StabilityPool,
}

impl SourceTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTemplate::Usdu => "USDU",
            SourceTemplate::TroveManagerEventsEmitter => "TroveManagerEventsEmitter",
            SourceTemplate::TroveNft => "TroveNFT",
            SourceTemplate::BatchManager => "BatchManager",
            SourceTemplate::StabilityPool => "StabilityPool",
        }
    }

    /// Event names consumed from contracts of this template.
    pub fn events(&self) -> &'static [&'static str] {
        match self {
            SourceTemplate::Usdu => &["CollateralRegistryAddressChanged"],
            SourceTemplate::TroveManagerEventsEmitter => &["TroveOperation", "BatchUpdated"],
            SourceTemplate::TroveNft => &["Transfer"],
            SourceTemplate::BatchManager => &["BatchUpdated"],
            SourceTemplate::StabilityPool => &["DepositOperation"],
        }
    }

    pub fn handles(&self, event_name: &str) -> bool {
        self.events().contains(&event_name)
    }
}

impl fmt::Display for SourceTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceTemplate {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USDU" => Ok(SourceTemplate::Usdu),
            "TroveManagerEventsEmitter" => Ok(SourceTemplate::TroveManagerEventsEmitter),
            "TroveNFT" => Ok(SourceTemplate::TroveNft),
            "BatchManager" => Ok(SourceTemplate::BatchManager),
            "StabilityPool" => Ok(SourceTemplate::StabilityPool),
            other => Err(format!("unknown source template: {}", other)),
        }
    }
}

/// A contract whose events are consumed from `start_block` onward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractSource {
    pub address: Address,
    pub template: SourceTemplate,
    /// Branch the contract belongs to; `None` for the root source.
    pub collateral_id: Option<String>,
    pub start_block: u64,
}
