//! Decoded contract events as delivered to the indexer.
//!
//! Envelopes are JSON-serializable so a recorded stream can be replayed from a
//! newline-delimited file.

use super::primitives::{Address, BlockInfo};
use super::uint::{serde_u256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One event with its block and emitting contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub block: BlockInfo,
    pub from_address: Address,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub receipt: Option<Receipt>,
    pub event: ChainEvent,
}

/// Logs emitted by the transaction that carried the event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(default)]
    pub logs: Vec<ReceiptLog>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLog {
    pub from_address: Address,
    /// Event keys; the first is the event selector.
    #[serde(default)]
    pub keys: Vec<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum ChainEvent {
    TroveOperation(TroveOperationEvent),
    BatchUpdated(BatchUpdatedEvent),
    Transfer(TransferEvent),
    CollateralRegistryAddressChanged(CollateralRegistryAddressChangedEvent),
    DepositOperation(DepositOperationEvent),
}

impl ChainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChainEvent::TroveOperation(_) => "TroveOperation",
            ChainEvent::BatchUpdated(_) => "BatchUpdated",
            ChainEvent::Transfer(_) => "Transfer",
            ChainEvent::CollateralRegistryAddressChanged(_) => "CollateralRegistryAddressChanged",
            ChainEvent::DepositOperation(_) => "DepositOperation",
        }
    }
}

/// Cairo signed integer encoding: magnitude plus sign flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAmount {
    #[serde(with = "serde_u256")]
    pub abs: U256,
    #[serde(default)]
    pub is_negative: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroveOperationEvent {
    #[serde(with = "serde_u256")]
    pub trove_id: U256,
    /// Active variant name of the on-chain operation enum.
    pub operation: String,
    #[serde(with = "serde_u256")]
    pub annual_interest_rate: U256,
    #[serde(default, with = "serde_u256")]
    pub debt_increase_from_redist: U256,
    #[serde(default)]
    pub debt_change_from_operation: SignedAmount,
    #[serde(default, with = "serde_u256")]
    pub coll_increase_from_redist: U256,
    #[serde(default)]
    pub coll_change_from_operation: SignedAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchUpdatedEvent {
    pub interest_batch_manager: Address,
    #[serde(with = "serde_u256")]
    pub debt: U256,
    #[serde(with = "serde_u256")]
    pub coll: U256,
    #[serde(with = "serde_u256")]
    pub annual_interest_rate: U256,
    #[serde(with = "serde_u256")]
    pub annual_management_fee: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    pub from: Address,
    pub to: Address,
    #[serde(with = "serde_u256")]
    pub token_id: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralRegistryAddressChangedEvent {
    pub new_collateral_registry: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositOperationEvent {
    pub depositor: Address,
    pub operation: String,
    #[serde(default)]
    pub top_up_or_withdrawal: SignedAmount,
    #[serde(default, with = "serde_u256")]
    pub yield_gain_since_last_operation: U256,
    #[serde(default, with = "serde_u256")]
    pub yield_gain_claimed: U256,
    #[serde(default, with = "serde_u256")]
    pub deposit_loss_since_last_operation: U256,
    #[serde(default, with = "serde_u256")]
    pub col_gain_since_last_operation: U256,
    #[serde(default, with = "serde_u256")]
    pub col_gain_claimed: U256,
}

/// Trove operation variants emitted by the trove manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    OpenTrove,
    CloseTrove,
    AdjustTrove,
    AdjustTroveInterestRate,
    ApplyPendingDebt,
    Liquidate,
    RedeemCollateral,
    OpenTroveAndJoinBatch,
    SetInterestBatchManager,
    RemoveFromBatch,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::OpenTrove => "OpenTrove",
            Operation::CloseTrove => "CloseTrove",
            Operation::AdjustTrove => "AdjustTrove",
            Operation::AdjustTroveInterestRate => "AdjustTroveInterestRate",
            Operation::ApplyPendingDebt => "ApplyPendingDebt",
            Operation::Liquidate => "Liquidate",
            Operation::RedeemCollateral => "RedeemCollateral",
            Operation::OpenTroveAndJoinBatch => "OpenTroveAndJoinBatch",
            Operation::SetInterestBatchManager => "SetInterestBatchManager",
            Operation::RemoveFromBatch => "RemoveFromBatch",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OpenTrove" => Ok(Operation::OpenTrove),
            "CloseTrove" => Ok(Operation::CloseTrove),
            "AdjustTrove" => Ok(Operation::AdjustTrove),
            "AdjustTroveInterestRate" => Ok(Operation::AdjustTroveInterestRate),
            "ApplyPendingDebt" => Ok(Operation::ApplyPendingDebt),
            "Liquidate" => Ok(Operation::Liquidate),
            "RedeemCollateral" => Ok(Operation::RedeemCollateral),
            "OpenTroveAndJoinBatch" => Ok(Operation::OpenTroveAndJoinBatch),
            "SetInterestBatchManager" => Ok(Operation::SetInterestBatchManager),
            "RemoveFromBatch" => Ok(Operation::RemoveFromBatch),
            other => Err(other.to_string()),
        }
    }
}

/// Stability-pool deposit operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpOperation {
    ProvideToSp,
    WithdrawFromSp,
    ClaimAllCollGains,
}

impl FromStr for SpOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "provide_to_sp" => Ok(SpOperation::ProvideToSp),
            "withdraw_from_sp" => Ok(SpOperation::WithdrawFromSp),
            "claim_all_coll_gains" => Ok(SpOperation::ClaimAllCollGains),
            other => Err(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_parse() {
        assert_eq!(
            "OpenTroveAndJoinBatch".parse::<Operation>().unwrap(),
            Operation::OpenTroveAndJoinBatch
        );
        assert_eq!("Frobnicate".parse::<Operation>().unwrap_err(), "Frobnicate");
        assert!("provide_to_sp".parse::<SpOperation>().is_ok());
        assert!("ProvideToSp".parse::<SpOperation>().is_err());
    }

    #[test]
    fn test_envelope_decodes_trove_operation() {
        let json = r#"{
            "block": {"number": 10, "timestamp": 1700000000},
            "from_address": "0xabc",
            "transaction_hash": "0x1",
            "event": {
                "name": "TroveOperation",
                "trove_id": "0x2a",
                "operation": "RedeemCollateral",
                "annual_interest_rate": "50000000000000000",
                "debt_change_from_operation": {"abs": "100", "is_negative": true},
                "coll_change_from_operation": {"abs": 7, "is_negative": true}
            }
        }"#;
        let envelope: EventEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.from_address, Address::parse("0xabc").unwrap());
        assert!(envelope.receipt.is_none());
        match envelope.event {
            ChainEvent::TroveOperation(op) => {
                assert_eq!(op.trove_id, U256::from(42u64));
                assert_eq!(op.debt_change_from_operation.abs, U256::from(100u64));
                assert!(op.debt_change_from_operation.is_negative);
                assert_eq!(op.coll_change_from_operation.abs, U256::from(7u64));
                assert_eq!(op.debt_increase_from_redist, U256::zero());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_envelope_decodes_receipt_logs() {
        let json = r#"{
            "block": {"number": 1, "timestamp": 1},
            "from_address": "0x1",
            "receipt": {"logs": [{"from_address": "0x5", "keys": ["0x99", "0x1"]}]},
            "event": {"name": "Transfer", "from": "0x0", "to": "0x7", "token_id": "3"}
        }"#;
        let envelope: EventEnvelope = serde_json::from_str(json).unwrap();
        let receipt = envelope.receipt.unwrap();
        assert_eq!(receipt.logs[0].keys[0], Address::from(0x99u64));
        assert_eq!(envelope.event.name(), "Transfer");
    }
}
