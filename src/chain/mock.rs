//! In-memory chain for tests without a node.
//!
//! Reads ignore the block number and return whatever was last set, so tests
//! mutate state between events to mimic the chain moving forward.

use super::{
    AddressesRegistryClient, BorrowerOperationsClient, BranchAddresses, ChainError,
    CollateralRegistryClient, LatestTroveData, TroveManagerClient, TroveNftClient, TroveRecord,
};
use crate::domain::{Address, U256};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MockState {
    latest: HashMap<(Address, U256), LatestTroveData>,
    records: HashMap<(Address, U256), TroveRecord>,
    owners: HashMap<(Address, U256), Address>,
    addresses_registries: HashMap<Address, Address>,
    /// registry -> [(token, trove manager)]
    collaterals: HashMap<Address, Vec<(Address, Address)>>,
    branch_addresses: HashMap<Address, BranchAddresses>,
    mcr: HashMap<Address, U256>,
    calls: usize,
}

/// Mock chain with settable contract state.
#[derive(Debug, Default)]
pub struct MockChain {
    state: Mutex<MockState>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A poisoned lock only happens after a panicking test.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Set `get_latest_trove_data` for a trove.
    pub fn set_trove_data(&self, trove_manager: &Address, trove_id: U256, data: LatestTroveData) {
        self.state()
            .latest
            .insert((trove_manager.clone(), trove_id), data);
    }

    /// Set `get_troves` for a trove.
    pub fn set_trove_record(&self, trove_manager: &Address, trove_id: U256, record: TroveRecord) {
        self.state()
            .records
            .insert((trove_manager.clone(), trove_id), record);
    }

    pub fn set_owner(&self, trove_nft: &Address, trove_id: U256, owner: Address) {
        self.state()
            .owners
            .insert((trove_nft.clone(), trove_id), owner);
    }

    /// Append a branch to a collateral registry.
    pub fn push_collateral(&self, registry: &Address, token: Address, trove_manager: Address) {
        self.state()
            .collaterals
            .entry(registry.clone())
            .or_default()
            .push((token, trove_manager));
    }

    /// Wire a trove manager to its addresses registry and the branch contracts.
    pub fn set_branch(
        &self,
        trove_manager: &Address,
        addresses_registry: Address,
        addresses: BranchAddresses,
        mcr: U256,
    ) {
        let mut state = self.state();
        state
            .mcr
            .insert(addresses.borrower_operations.clone(), mcr);
        state
            .branch_addresses
            .insert(addresses_registry.clone(), addresses);
        state
            .addresses_registries
            .insert(trove_manager.clone(), addresses_registry);
    }

    /// Number of reads served so far.
    pub fn call_count(&self) -> usize {
        self.state().calls
    }
}

fn missing(what: &str, key: impl std::fmt::Display) -> ChainError {
    ChainError::Missing(format!("{} for {}", what, key))
}

#[async_trait]
impl TroveManagerClient for MockChain {
    async fn get_latest_trove_data(
        &self,
        trove_manager: &Address,
        trove_id: U256,
        _block: u64,
    ) -> Result<LatestTroveData, ChainError> {
        let mut state = self.state();
        state.calls += 1;
        state
            .latest
            .get(&(trove_manager.clone(), trove_id))
            .cloned()
            .ok_or_else(|| missing("latest trove data", trove_id))
    }

    async fn get_trove(
        &self,
        trove_manager: &Address,
        trove_id: U256,
        _block: u64,
    ) -> Result<TroveRecord, ChainError> {
        let mut state = self.state();
        state.calls += 1;
        Ok(state
            .records
            .get(&(trove_manager.clone(), trove_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn get_addresses_registry(
        &self,
        trove_manager: &Address,
        _block: u64,
    ) -> Result<Address, ChainError> {
        let mut state = self.state();
        state.calls += 1;
        state
            .addresses_registries
            .get(trove_manager)
            .cloned()
            .ok_or_else(|| missing("addresses registry", trove_manager))
    }
}

#[async_trait]
impl TroveNftClient for MockChain {
    async fn owner_of(
        &self,
        trove_nft: &Address,
        trove_id: U256,
        _block: u64,
    ) -> Result<Address, ChainError> {
        let mut state = self.state();
        state.calls += 1;
        state
            .owners
            .get(&(trove_nft.clone(), trove_id))
            .cloned()
            .ok_or_else(|| missing("owner", trove_id))
    }
}

#[async_trait]
impl CollateralRegistryClient for MockChain {
    async fn get_num_collaterals(&self, registry: &Address, _block: u64) -> Result<u32, ChainError> {
        let mut state = self.state();
        state.calls += 1;
        let count = state.collaterals.get(registry).map(Vec::len).unwrap_or(0);
        u32::try_from(count).map_err(|e| ChainError::Decode(e.to_string()))
    }

    async fn get_collateral(
        &self,
        registry: &Address,
        index: u32,
        _block: u64,
    ) -> Result<Address, ChainError> {
        let mut state = self.state();
        state.calls += 1;
        Ok(state
            .collaterals
            .get(registry)
            .and_then(|list| list.get(index as usize))
            .map(|(token, _)| token.clone())
            .unwrap_or_else(Address::zero))
    }

    async fn get_trove_manager(
        &self,
        registry: &Address,
        index: u32,
        _block: u64,
    ) -> Result<Address, ChainError> {
        let mut state = self.state();
        state.calls += 1;
        Ok(state
            .collaterals
            .get(registry)
            .and_then(|list| list.get(index as usize))
            .map(|(_, trove_manager)| trove_manager.clone())
            .unwrap_or_else(Address::zero))
    }
}

#[async_trait]
impl AddressesRegistryClient for MockChain {
    async fn get_branch_addresses(
        &self,
        addresses_registry: &Address,
        _block: u64,
    ) -> Result<BranchAddresses, ChainError> {
        let mut state = self.state();
        state.calls += 1;
        state
            .branch_addresses
            .get(addresses_registry)
            .cloned()
            .ok_or_else(|| missing("branch addresses", addresses_registry))
    }
}

#[async_trait]
impl BorrowerOperationsClient for MockChain {
    async fn get_mcr(&self, borrower_operations: &Address, _block: u64) -> Result<U256, ChainError> {
        let mut state = self.state();
        state.calls += 1;
        state
            .mcr
            .get(borrower_operations)
            .copied()
            .ok_or_else(|| missing("mcr", borrower_operations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_latest_set_value() {
        let chain = MockChain::new();
        let tm = Address::from(0x10u64);
        let id = U256::from(1u64);
        chain.set_trove_data(
            &tm,
            id,
            LatestTroveData {
                entire_debt: U256::from(5u64),
                ..Default::default()
            },
        );
        chain.set_trove_data(
            &tm,
            id,
            LatestTroveData {
                entire_debt: U256::from(9u64),
                ..Default::default()
            },
        );
        let data = chain.get_latest_trove_data(&tm, id, 0).await.unwrap();
        assert_eq!(data.entire_debt, U256::from(9u64));
        assert_eq!(chain.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_registry_past_end_is_zero() {
        let chain = MockChain::new();
        let registry = Address::from(0x1u64);
        chain.push_collateral(&registry, Address::from(2u64), Address::from(3u64));
        assert_eq!(chain.get_num_collaterals(&registry, 0).await.unwrap(), 1);
        assert!(chain.get_collateral(&registry, 1, 0).await.unwrap().is_zero());
        assert_eq!(
            chain.get_trove_manager(&registry, 0, 0).await.unwrap(),
            Address::from(3u64)
        );
    }

    #[tokio::test]
    async fn test_mock_missing_data_is_error() {
        let chain = MockChain::new();
        let err = chain
            .owner_of(&Address::from(1u64), U256::one(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Missing(_)));
    }
}
