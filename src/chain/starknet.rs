//! Starknet JSON-RPC client (`starknet_call`).

use super::{
    AddressesRegistryClient, BorrowerOperationsClient, BranchAddresses, ChainError,
    CollateralRegistryClient, LatestTroveData, TroveManagerClient, TroveNftClient, TroveRecord,
};
use crate::domain::{parse_u256, Address, U256};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use sha3::{Digest, Keccak256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Felt offsets into the serialized `LatestTroveData` struct (u256 = 2 felts).
const LATEST_ENTIRE_DEBT: usize = 0;
const LATEST_ENTIRE_COLL: usize = 2;
const LATEST_ANNUAL_INTEREST_RATE: usize = 12;

/// Felt offsets into the serialized `Trove` struct.
const TROVE_STAKE: usize = 4;
const TROVE_INTEREST_BATCH_MANAGER: usize = 12;

/// `starknet_keccak`: Keccak-256 of the name truncated to 250 bits.
pub fn starknet_keccak(name: &str) -> U256 {
    let digest = Keccak256::digest(name.as_bytes());
    let mask = (U256::one() << 250) - U256::one();
    U256::from_big_endian(digest.as_slice()) & mask
}

/// Starknet node accessed over JSON-RPC.
#[derive(Debug)]
pub struct StarknetRpcClient {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl StarknetRpcClient {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
            next_id: AtomicU64::new(1),
        }
    }

    /// Call a view entry point at `block`, returning the raw result felts.
    async fn call(
        &self,
        contract: &Address,
        entry_point: &str,
        calldata: &[U256],
        block: u64,
    ) -> Result<Vec<U256>, ChainError> {
        debug!(
            contract = %contract,
            entry_point,
            block,
            "starknet_call"
        );

        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": "starknet_call",
            "params": {
                "request": {
                    "contract_address": contract.as_str(),
                    "entry_point_selector": format!("{:#x}", starknet_keccak(entry_point)),
                    "calldata": calldata.iter().map(|v| format!("{:#x}", v)).collect::<Vec<_>>(),
                },
                "block_id": { "block_number": block },
            },
        });

        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        let body = retry(backoff, || async {
            let response = self
                .client
                .post(&self.url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(ChainError::Network(e.to_string())))?;

            let status = response.status();
            if status == 429 || status.is_server_error() {
                return Err(backoff::Error::transient(ChainError::Http {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(ChainError::Http {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(ChainError::Decode(e.to_string())))
        })
        .await?;

        parse_call_result(&body)
    }

    async fn call_address(
        &self,
        contract: &Address,
        entry_point: &str,
        calldata: &[U256],
        block: u64,
    ) -> Result<Address, ChainError> {
        let felts = self.call(contract, entry_point, calldata, block).await?;
        felt_at(&felts, 0).map(Address::from)
    }
}

fn parse_call_result(body: &serde_json::Value) -> Result<Vec<U256>, ChainError> {
    if let Some(error) = body.get("error") {
        return Err(ChainError::Rpc {
            code: error.get("code").and_then(|c| c.as_i64()).unwrap_or(0),
            message: error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
                .to_string(),
        });
    }

    let result = body
        .get("result")
        .and_then(|r| r.as_array())
        .ok_or_else(|| ChainError::Decode("Expected array result".to_string()))?;

    result
        .iter()
        .map(|felt| {
            felt.as_str()
                .ok_or_else(|| ChainError::Decode(format!("Expected felt string, got {}", felt)))
                .and_then(|s| {
                    parse_u256(s).map_err(|e| ChainError::Decode(format!("Invalid felt: {}", e)))
                })
        })
        .collect()
}

fn felt_at(felts: &[U256], index: usize) -> Result<U256, ChainError> {
    felts.get(index).copied().ok_or_else(|| {
        ChainError::Decode(format!(
            "Expected at least {} felts, got {}",
            index + 1,
            felts.len()
        ))
    })
}

/// Cairo u256 serialized as (low, high) 128-bit felts.
fn u256_at(felts: &[U256], index: usize) -> Result<U256, ChainError> {
    let low = felt_at(felts, index)?;
    let high = felt_at(felts, index + 1)?;
    let limit = U256::one() << 128;
    if low >= limit || high >= limit {
        return Err(ChainError::Decode(format!(
            "u256 limb out of range at felt {}",
            index
        )));
    }
    Ok((high << 128) | low)
}

fn u256_calldata(value: U256) -> [U256; 2] {
    let mask = (U256::one() << 128) - U256::one();
    [value & mask, value >> 128]
}

fn felt_to_u32(value: U256) -> Result<u32, ChainError> {
    if value > U256::from(u32::MAX) {
        return Err(ChainError::Decode(format!("Value {} exceeds u32", value)));
    }
    Ok(value.low_u32())
}

#[async_trait]
impl TroveManagerClient for StarknetRpcClient {
    async fn get_latest_trove_data(
        &self,
        trove_manager: &Address,
        trove_id: U256,
        block: u64,
    ) -> Result<LatestTroveData, ChainError> {
        let felts = self
            .call(
                trove_manager,
                "get_latest_trove_data",
                &u256_calldata(trove_id),
                block,
            )
            .await?;
        decode_latest_trove_data(&felts)
    }

    async fn get_trove(
        &self,
        trove_manager: &Address,
        trove_id: U256,
        block: u64,
    ) -> Result<TroveRecord, ChainError> {
        let felts = self
            .call(trove_manager, "get_troves", &u256_calldata(trove_id), block)
            .await?;
        decode_trove_record(&felts)
    }

    async fn get_addresses_registry(
        &self,
        trove_manager: &Address,
        block: u64,
    ) -> Result<Address, ChainError> {
        self.call_address(trove_manager, "get_addresses_registry", &[], block)
            .await
    }
}

fn decode_latest_trove_data(felts: &[U256]) -> Result<LatestTroveData, ChainError> {
    Ok(LatestTroveData {
        entire_debt: u256_at(felts, LATEST_ENTIRE_DEBT)?,
        entire_coll: u256_at(felts, LATEST_ENTIRE_COLL)?,
        annual_interest_rate: u256_at(felts, LATEST_ANNUAL_INTEREST_RATE)?,
    })
}

fn decode_trove_record(felts: &[U256]) -> Result<TroveRecord, ChainError> {
    Ok(TroveRecord {
        stake: u256_at(felts, TROVE_STAKE)?,
        interest_batch_manager: Address::from(felt_at(felts, TROVE_INTEREST_BATCH_MANAGER)?),
    })
}

#[async_trait]
impl TroveNftClient for StarknetRpcClient {
    async fn owner_of(
        &self,
        trove_nft: &Address,
        trove_id: U256,
        block: u64,
    ) -> Result<Address, ChainError> {
        self.call_address(trove_nft, "owner_of", &u256_calldata(trove_id), block)
            .await
    }
}

#[async_trait]
impl CollateralRegistryClient for StarknetRpcClient {
    async fn get_num_collaterals(&self, registry: &Address, block: u64) -> Result<u32, ChainError> {
        let felts = self
            .call(registry, "get_num_collaterals", &[], block)
            .await?;
        felt_to_u32(felt_at(&felts, 0)?)
    }

    async fn get_collateral(
        &self,
        registry: &Address,
        index: u32,
        block: u64,
    ) -> Result<Address, ChainError> {
        self.call_address(registry, "get_collateral", &[U256::from(index)], block)
            .await
    }

    async fn get_trove_manager(
        &self,
        registry: &Address,
        index: u32,
        block: u64,
    ) -> Result<Address, ChainError> {
        self.call_address(registry, "get_trove_manager", &[U256::from(index)], block)
            .await
    }
}

#[async_trait]
impl AddressesRegistryClient for StarknetRpcClient {
    async fn get_branch_addresses(
        &self,
        addresses_registry: &Address,
        block: u64,
    ) -> Result<BranchAddresses, ChainError> {
        let registry = addresses_registry;

        Ok(BranchAddresses {
            borrower_operations: self
                .call_address(registry, "get_borrower_operations", &[], block)
                .await?,
            sorted_troves: self
                .call_address(registry, "get_sorted_troves", &[], block)
                .await?,
            stability_pool: self
                .call_address(registry, "get_stability_pool", &[], block)
                .await?,
            trove_manager_events_emitter: self
                .call_address(registry, "get_trove_manager_events_emitter", &[], block)
                .await?,
            trove_nft: self
                .call_address(registry, "get_trove_nft", &[], block)
                .await?,
            liquidation_manager: self
                .call_address(registry, "get_liquidation_manager", &[], block)
                .await?,
            redemption_manager: self
                .call_address(registry, "get_redemption_manager", &[], block)
                .await?,
            batch_manager: self
                .call_address(registry, "get_batch_manager", &[], block)
                .await?,
        })
    }
}

#[async_trait]
impl BorrowerOperationsClient for StarknetRpcClient {
    async fn get_mcr(&self, borrower_operations: &Address, block: u64) -> Result<U256, ChainError> {
        let felts = self
            .call(borrower_operations, "get_mcr", &[], block)
            .await?;
        u256_at(&felts, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn felts(values: &[u64]) -> Vec<U256> {
        values.iter().map(|v| U256::from(*v)).collect()
    }

    #[test]
    fn test_selector_matches_known_value() {
        let expected =
            parse_u256("0x83afd3f4caedc6eebf44246fe54e38c95e3179a5ec9ea81740eca5b482d12e")
                .unwrap();
        assert_eq!(starknet_keccak("transfer"), expected);
    }

    #[test]
    fn test_selector_fits_in_250_bits() {
        assert!(starknet_keccak("FlashLoan") < (U256::one() << 250));
    }

    #[test]
    fn test_u256_from_limbs() {
        let high_one = (U256::one() << 128) + U256::from(5u64);
        assert_eq!(u256_at(&felts(&[5, 1]), 0).unwrap(), high_one);
        assert!(u256_at(&felts(&[5]), 0).is_err());
    }

    #[test]
    fn test_u256_calldata_splits_limbs() {
        let value = (U256::from(3u64) << 128) + U256::from(9u64);
        assert_eq!(u256_calldata(value), [U256::from(9u64), U256::from(3u64)]);
    }

    #[test]
    fn test_decode_latest_trove_data() {
        let raw = felts(&[100, 0, 20, 0, 0, 0, 0, 0, 0, 0, 0, 0, 7, 0, 0, 0]);
        let data = decode_latest_trove_data(&raw).unwrap();
        assert_eq!(data.entire_debt, U256::from(100u64));
        assert_eq!(data.entire_coll, U256::from(20u64));
        assert_eq!(data.annual_interest_rate, U256::from(7u64));
    }

    #[test]
    fn test_decode_trove_record() {
        let raw = felts(&[0, 0, 0, 0, 44, 0, 1, 0, 0, 0, 0, 0, 0xbeef, 0, 0]);
        let record = decode_trove_record(&raw).unwrap();
        assert_eq!(record.stake, U256::from(44u64));
        assert_eq!(record.interest_batch_manager, Address::from(0xbeefu64));
    }

    #[test]
    fn test_parse_call_result_error_object() {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": 20, "message": "Contract not found"}
        });
        assert_eq!(
            parse_call_result(&body).unwrap_err(),
            ChainError::Rpc {
                code: 20,
                message: "Contract not found".to_string()
            }
        );
    }

    #[test]
    fn test_parse_call_result_felts() {
        let body = serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": ["0x2", "0x0"]});
        assert_eq!(parse_call_result(&body).unwrap(), felts(&[2, 0]));
    }
}
