//! One handler per consumed event. Each runs inside the event's `Store`
//! transaction and reads chain state pinned to the event's block.

pub mod batches;
pub mod borrowers;
pub mod registry;
pub mod stability_pool;
pub mod transfers;
pub mod troves;

use crate::chain::ChainClient;
use crate::db::Store;
use crate::domain::{Address, BlockInfo, CollateralAddresses, ContractSource, Receipt};
use crate::engine::PointsWeights;
use crate::error::IndexerError;

/// Everything a handler needs besides the store and the event payload.
pub struct HandlerContext<'a> {
    pub chain: &'a dyn ChainClient,
    pub block: BlockInfo,
    pub tx_hash: Option<&'a str>,
    pub receipt: Option<&'a Receipt>,
    pub source: &'a ContractSource,
    pub flash_loan_key: &'a Address,
    pub weights: &'a PointsWeights,
}

impl HandlerContext<'_> {
    pub fn timestamp(&self) -> u64 {
        self.block.timestamp
    }

    /// Branch the emitting contract was registered for.
    pub fn collateral_id(&self) -> Result<&str, IndexerError> {
        self.source.collateral_id.as_deref().ok_or_else(|| {
            IndexerError::Invariant(format!(
                "{} source {} has no collateral branch",
                self.source.template, self.source.address
            ))
        })
    }

    pub async fn branch_addresses(
        &self,
        store: &mut Store,
    ) -> Result<CollateralAddresses, IndexerError> {
        let collateral_id = self.collateral_id()?;
        store
            .load_collateral_addresses(collateral_id)
            .await?
            .ok_or_else(|| IndexerError::CollateralNotFound(collateral_id.to_string()))
    }

    pub async fn branch_index(&self, store: &mut Store) -> Result<u32, IndexerError> {
        let collateral_id = self.collateral_id()?;
        store
            .load_collateral(collateral_id)
            .await?
            .map(|c| c.coll_index)
            .ok_or_else(|| IndexerError::CollateralNotFound(collateral_id.to_string()))
    }
}
