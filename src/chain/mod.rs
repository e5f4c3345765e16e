//! Contract read abstraction for the trove protocol.
//!
//! One trait per contract kind; every read is pinned to a block number so a
//! handler observes the state the event was emitted in.

use crate::domain::{Address, U256};
use async_trait::async_trait;
use std::fmt;

pub mod mock;
pub mod starknet;

pub use mock::MockChain;
pub use starknet::{starknet_keccak, StarknetRpcClient};

/// `get_latest_trove_data` projection used by the indexer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestTroveData {
    pub entire_debt: U256,
    pub entire_coll: U256,
    pub annual_interest_rate: U256,
}

/// `get_troves` projection used by the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TroveRecord {
    pub stake: U256,
    /// Zero address when the trove is not batch-managed.
    pub interest_batch_manager: Address,
}

impl Default for TroveRecord {
    fn default() -> Self {
        TroveRecord {
            stake: U256::zero(),
            interest_batch_manager: Address::zero(),
        }
    }
}

/// Contracts of one branch as listed by its addresses registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchAddresses {
    pub borrower_operations: Address,
    pub sorted_troves: Address,
    pub stability_pool: Address,
    pub trove_manager_events_emitter: Address,
    pub trove_nft: Address,
    pub liquidation_manager: Address,
    pub redemption_manager: Address,
    pub batch_manager: Address,
}

#[async_trait]
pub trait TroveManagerClient: Send + Sync + fmt::Debug {
    async fn get_latest_trove_data(
        &self,
        trove_manager: &Address,
        trove_id: U256,
        block: u64,
    ) -> Result<LatestTroveData, ChainError>;

    async fn get_trove(
        &self,
        trove_manager: &Address,
        trove_id: U256,
        block: u64,
    ) -> Result<TroveRecord, ChainError>;

    async fn get_addresses_registry(
        &self,
        trove_manager: &Address,
        block: u64,
    ) -> Result<Address, ChainError>;
}

#[async_trait]
pub trait TroveNftClient: Send + Sync + fmt::Debug {
    async fn owner_of(
        &self,
        trove_nft: &Address,
        trove_id: U256,
        block: u64,
    ) -> Result<Address, ChainError>;
}

#[async_trait]
pub trait CollateralRegistryClient: Send + Sync + fmt::Debug {
    async fn get_num_collaterals(&self, registry: &Address, block: u64) -> Result<u32, ChainError>;

    async fn get_collateral(
        &self,
        registry: &Address,
        index: u32,
        block: u64,
    ) -> Result<Address, ChainError>;

    async fn get_trove_manager(
        &self,
        registry: &Address,
        index: u32,
        block: u64,
    ) -> Result<Address, ChainError>;
}

#[async_trait]
pub trait AddressesRegistryClient: Send + Sync + fmt::Debug {
    async fn get_branch_addresses(
        &self,
        addresses_registry: &Address,
        block: u64,
    ) -> Result<BranchAddresses, ChainError>;
}

#[async_trait]
pub trait BorrowerOperationsClient: Send + Sync + fmt::Debug {
    async fn get_mcr(&self, borrower_operations: &Address, block: u64) -> Result<U256, ChainError>;
}

/// Everything the indexer reads from chain.
pub trait ChainClient:
    TroveManagerClient
    + TroveNftClient
    + CollateralRegistryClient
    + AddressesRegistryClient
    + BorrowerOperationsClient
{
}

impl<T> ChainClient for T where
    T: TroveManagerClient
        + TroveNftClient
        + CollateralRegistryClient
        + AddressesRegistryClient
        + BorrowerOperationsClient
{
}

/// Error type for contract reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// Transport failure (connection refused, timeout, DNS)
    Network(String),
    /// Non-success HTTP status
    Http { status: u16, message: String },
    /// JSON-RPC error object returned by the node
    Rpc { code: i64, message: String },
    /// Response did not have the expected shape
    Decode(String),
    /// No canned response (mock only)
    Missing(String),
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainError::Network(msg) => write!(f, "Network error: {}", msg),
            ChainError::Http { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            ChainError::Rpc { code, message } => write!(f, "RPC error {}: {}", code, message),
            ChainError::Decode(msg) => write!(f, "Decode error: {}", msg),
            ChainError::Missing(msg) => write!(f, "No chain data: {}", msg),
        }
    }
}

impl std::error::Error for ChainError {}
