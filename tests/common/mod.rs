#![allow(dead_code)]

use std::sync::Arc;
use tempfile::TempDir;
use trove_indexer::chain::{BranchAddresses, LatestTroveData, TroveRecord};
use trove_indexer::db::init_db;
use trove_indexer::domain::events::{
    BatchUpdatedEvent, CollateralRegistryAddressChangedEvent, DepositOperationEvent,
    TransferEvent, TroveOperationEvent,
};
use trove_indexer::domain::{
    Address, BlockInfo, ChainEvent, EventEnvelope, Receipt, SignedAmount, DECIMAL_PRECISION, U256,
};
use trove_indexer::engine::PointsWeights;
use trove_indexer::{Indexer, IndexerError, MockChain, Repository};

pub const ROOT: u64 = 0x100;
pub const REGISTRY: u64 = 0x200;
pub const TOKEN: u64 = 0x300;
pub const TROVE_MANAGER: u64 = 0x400;
pub const ADDRESSES_REGISTRY: u64 = 0x500;
pub const BORROWER_OPERATIONS: u64 = 0x601;
pub const SORTED_TROVES: u64 = 0x602;
pub const STABILITY_POOL: u64 = 0x603;
pub const EVENTS_EMITTER: u64 = 0x604;
pub const TROVE_NFT: u64 = 0x605;
pub const LIQUIDATION_MANAGER: u64 = 0x606;
pub const REDEMPTION_MANAGER: u64 = 0x607;
pub const BATCH_MANAGER_CONTRACT: u64 = 0x608;

pub const BOOTSTRAP_BLOCK: u64 = 1;

pub fn addr(n: u64) -> Address {
    Address::from(n)
}

pub fn e18(n: u64) -> U256 {
    U256::from(n) * U256::from(DECIMAL_PRECISION)
}

/// Annual rate in whole percent, 18 decimals.
pub fn pct(n: u64) -> U256 {
    U256::from(n) * U256::from(10_000_000_000_000_000u64)
}

pub fn branch_addresses() -> BranchAddresses {
    BranchAddresses {
        borrower_operations: addr(BORROWER_OPERATIONS),
        sorted_troves: addr(SORTED_TROVES),
        stability_pool: addr(STABILITY_POOL),
        trove_manager_events_emitter: addr(EVENTS_EMITTER),
        trove_nft: addr(TROVE_NFT),
        liquidation_manager: addr(LIQUIDATION_MANAGER),
        redemption_manager: addr(REDEMPTION_MANAGER),
        batch_manager: addr(BATCH_MANAGER_CONTRACT),
    }
}

pub struct TestIndexer {
    pub indexer: Indexer,
    pub repo: Repository,
    pub chain: Arc<MockChain>,
    _temp: TempDir,
}

pub async fn setup_unbootstrapped(weights: PointsWeights) -> TestIndexer {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Repository::new(pool, "testnet");

    let chain = Arc::new(MockChain::new());
    chain.push_collateral(&addr(REGISTRY), addr(TOKEN), addr(TROVE_MANAGER));
    chain.set_branch(
        &addr(TROVE_MANAGER),
        addr(ADDRESSES_REGISTRY),
        branch_addresses(),
        U256::from(1_100_000_000_000_000_000u64),
    );

    let indexer = Indexer::new(repo.clone(), chain.clone())
        .with_flash_loan_key(addr(0xf1a5))
        .with_points_weights(weights);
    indexer.register_root_source(&addr(ROOT), 0).await.unwrap();

    TestIndexer {
        indexer,
        repo,
        chain,
        _temp: temp_dir,
    }
}

/// Indexer with branch 0 registered at block 1.
pub async fn setup() -> TestIndexer {
    setup_with_weights(PointsWeights::default().with_weight(addr(STABILITY_POOL), e18(1))).await
}

pub async fn setup_with_weights(weights: PointsWeights) -> TestIndexer {
    let t = setup_unbootstrapped(weights).await;
    t.indexer
        .process(&registry_changed(BOOTSTRAP_BLOCK, REGISTRY))
        .await
        .unwrap();
    t
}

impl TestIndexer {
    /// Chain state of a trove as the trove manager reports it.
    pub fn set_trove(&self, trove_id: u64, debt: U256, coll: U256, rate: U256) {
        self.chain.set_trove_data(
            &addr(TROVE_MANAGER),
            U256::from(trove_id),
            LatestTroveData {
                entire_debt: debt,
                entire_coll: coll,
                annual_interest_rate: rate,
            },
        );
        self.chain.set_trove_record(
            &addr(TROVE_MANAGER),
            U256::from(trove_id),
            TroveRecord {
                stake: coll,
                interest_batch_manager: Address::zero(),
            },
        );
    }

    pub fn set_batch_manager(&self, trove_id: u64, manager: Address) {
        self.chain.set_trove_record(
            &addr(TROVE_MANAGER),
            U256::from(trove_id),
            TroveRecord {
                stake: U256::zero(),
                interest_batch_manager: manager,
            },
        );
    }

    pub fn set_owner(&self, trove_id: u64, owner: Address) {
        self.chain
            .set_owner(&addr(TROVE_NFT), U256::from(trove_id), owner);
    }

    pub async fn trove_op(
        &self,
        block: u64,
        timestamp: u64,
        trove_id: u64,
        operation: &str,
        rate: U256,
    ) -> Result<(), IndexerError> {
        self.indexer
            .process(&trove_operation(block, timestamp, trove_id, operation, rate))
            .await
    }

    /// Open `trove_id` for `owner` with the given chain state.
    pub async fn open(
        &self,
        block: u64,
        timestamp: u64,
        trove_id: u64,
        owner: Address,
        debt: U256,
        rate: U256,
    ) {
        self.set_trove(trove_id, debt, debt * 2, rate);
        self.set_owner(trove_id, owner);
        self.trove_op(block, timestamp, trove_id, "OpenTrove", rate)
            .await
            .unwrap();
    }

    pub async fn bracket_debt(&self, rate: U256) -> Option<U256> {
        let id = trove_indexer::domain::bracket_id("0", trove_indexer::domain::bracket_rate(rate));
        self.repo
            .get_bracket(&id)
            .await
            .unwrap()
            .map(|b| b.accrual.total_debt)
    }

    pub async fn trove(&self, trove_id: u64) -> trove_indexer::Trove {
        self.repo
            .get_trove(&format!("0:{}", addr(trove_id)))
            .await
            .unwrap()
            .expect("trove exists")
    }
}

pub fn envelope(block: u64, timestamp: u64, from: u64, event: ChainEvent) -> EventEnvelope {
    EventEnvelope {
        block: BlockInfo {
            number: block,
            timestamp,
        },
        from_address: addr(from),
        transaction_hash: Some(format!("0x{:x}", block * 1000 + timestamp)),
        receipt: None,
        event,
    }
}

pub fn registry_changed(block: u64, registry: u64) -> EventEnvelope {
    envelope(
        block,
        block * 10,
        ROOT,
        ChainEvent::CollateralRegistryAddressChanged(CollateralRegistryAddressChangedEvent {
            new_collateral_registry: addr(registry),
        }),
    )
}

pub fn trove_operation_event(trove_id: u64, operation: &str, rate: U256) -> TroveOperationEvent {
    TroveOperationEvent {
        trove_id: U256::from(trove_id),
        operation: operation.to_string(),
        annual_interest_rate: rate,
        debt_increase_from_redist: U256::zero(),
        debt_change_from_operation: SignedAmount::default(),
        coll_increase_from_redist: U256::zero(),
        coll_change_from_operation: SignedAmount::default(),
    }
}

pub fn trove_operation(
    block: u64,
    timestamp: u64,
    trove_id: u64,
    operation: &str,
    rate: U256,
) -> EventEnvelope {
    envelope(
        block,
        timestamp,
        EVENTS_EMITTER,
        ChainEvent::TroveOperation(trove_operation_event(trove_id, operation, rate)),
    )
}

pub fn with_receipt(mut envelope: EventEnvelope, receipt: Receipt) -> EventEnvelope {
    envelope.receipt = Some(receipt);
    envelope
}

pub fn batch_updated(
    block: u64,
    timestamp: u64,
    manager: Address,
    debt: U256,
    rate: U256,
) -> EventEnvelope {
    envelope(
        block,
        timestamp,
        EVENTS_EMITTER,
        ChainEvent::BatchUpdated(BatchUpdatedEvent {
            interest_batch_manager: manager,
            debt,
            coll: debt * 2,
            annual_interest_rate: rate,
            annual_management_fee: pct(1) / 10,
        }),
    )
}

pub fn transfer(block: u64, timestamp: u64, from: Address, to: Address, trove_id: u64) -> EventEnvelope {
    envelope(
        block,
        timestamp,
        TROVE_NFT,
        ChainEvent::Transfer(TransferEvent {
            from,
            to,
            token_id: U256::from(trove_id),
        }),
    )
}

pub fn deposit_operation(depositor: Address, operation: &str, amount: U256) -> DepositOperationEvent {
    DepositOperationEvent {
        depositor,
        operation: operation.to_string(),
        top_up_or_withdrawal: SignedAmount {
            abs: amount,
            is_negative: operation == "withdraw_from_sp",
        },
        yield_gain_since_last_operation: U256::zero(),
        yield_gain_claimed: U256::zero(),
        deposit_loss_since_last_operation: U256::zero(),
        col_gain_since_last_operation: U256::zero(),
        col_gain_claimed: U256::zero(),
    }
}

pub fn sp_envelope(block: u64, timestamp: u64, event: DepositOperationEvent) -> EventEnvelope {
    envelope(block, timestamp, STABILITY_POOL, ChainEvent::DepositOperation(event))
}
