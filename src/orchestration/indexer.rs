use super::handlers::batches::handle_batch_updated;
use super::handlers::registry::handle_registry_changed;
use super::handlers::stability_pool::handle_deposit_operation;
use super::handlers::transfers::handle_transfer;
use super::handlers::troves::handle_trove_operation;
use super::handlers::HandlerContext;
use crate::chain::{starknet_keccak, ChainClient};
use crate::db::Repository;
use crate::domain::{Address, ChainEvent, EventEnvelope, SourceTemplate};
use crate::engine::PointsWeights;
use crate::error::IndexerError;
use std::sync::Arc;
use tracing::{debug, info};

/// Applies events one at a time, each in its own transaction.
#[derive(Clone)]
pub struct Indexer {
    repo: Repository,
    chain: Arc<dyn ChainClient>,
    flash_loan_key: Address,
    weights: Arc<PointsWeights>,
}

impl Indexer {
    pub fn new(repo: Repository, chain: Arc<dyn ChainClient>) -> Self {
        Self {
            repo,
            chain,
            flash_loan_key: Address::from(starknet_keccak("FlashLoan")),
            weights: Arc::new(PointsWeights::default()),
        }
    }

    pub fn with_flash_loan_key(mut self, key: Address) -> Self {
        self.flash_loan_key = key;
        self
    }

    pub fn with_points_weights(mut self, weights: PointsWeights) -> Self {
        self.weights = Arc::new(weights);
        self
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    pub fn flash_loan_key(&self) -> &Address {
        &self.flash_loan_key
    }

    /// Register the stablecoin contract whose registry changes bootstrap
    /// every branch. Returns false if it was already registered.
    pub async fn register_root_source(
        &self,
        address: &Address,
        start_block: u64,
    ) -> Result<bool, IndexerError> {
        let mut store = self.repo.begin().await?;
        let created = store
            .register_source(SourceTemplate::Usdu, address, None, start_block)
            .await?;
        store.commit().await?;

        if created {
            info!(address = %address, start_block, "Root source registered");
        }
        Ok(created)
    }

    /// Apply one event. Nothing is persisted unless every step succeeds.
    pub async fn process(&self, envelope: &EventEnvelope) -> Result<(), IndexerError> {
        let name = envelope.event.name();
        let mut store = self.repo.begin().await?;

        let sources = store.load_sources(&envelope.from_address).await?;
        let source = match sources.iter().find(|s| s.template.handles(name)) {
            Some(source) => source,
            None => {
                return Err(match sources.first() {
                    Some(other) => IndexerError::EventNotHandled {
                        address: envelope.from_address.clone(),
                        template: other.template,
                        event: name,
                    },
                    None => IndexerError::UnknownSource(envelope.from_address.clone()),
                });
            }
        };

        if envelope.block.number < source.start_block {
            debug!(
                address = %source.address,
                block = envelope.block.number,
                start_block = source.start_block,
                "Skipping event before source start block"
            );
            return Ok(());
        }

        let ctx = HandlerContext {
            chain: self.chain.as_ref(),
            block: envelope.block,
            tx_hash: envelope.transaction_hash.as_deref(),
            receipt: envelope.receipt.as_ref(),
            source,
            flash_loan_key: &self.flash_loan_key,
            weights: &self.weights,
        };

        match &envelope.event {
            ChainEvent::TroveOperation(event) => handle_trove_operation(&mut store, &ctx, event).await?,
            ChainEvent::BatchUpdated(event) => handle_batch_updated(&mut store, &ctx, event).await?,
            ChainEvent::Transfer(event) => handle_transfer(&mut store, &ctx, event).await?,
            ChainEvent::CollateralRegistryAddressChanged(event) => {
                let created = handle_registry_changed(&mut store, &ctx, event).await?;
                info!(registry = %event.new_collateral_registry, created, "Collateral registry processed");
            }
            ChainEvent::DepositOperation(event) => {
                handle_deposit_operation(&mut store, &ctx, event).await?
            }
        }

        store.commit().await?;
        debug!(
            event = name,
            address = %envelope.from_address,
            block = envelope.block.number,
            "Event applied"
        );
        Ok(())
    }
}
