//! `CollateralRegistryAddressChanged`: discover collateral branches and
//! register their contracts as event sources.

use super::HandlerContext;
use crate::db::Store;
use crate::domain::events::CollateralRegistryAddressChangedEvent;
use crate::domain::{Collateral, CollateralAddresses, SourceTemplate};
use crate::error::IndexerError;
use tracing::{debug, info};

/// Returns the number of branches created by this event.
pub async fn handle_registry_changed(
    store: &mut Store,
    ctx: &HandlerContext<'_>,
    event: &CollateralRegistryAddressChangedEvent,
) -> Result<u32, IndexerError> {
    let registry = &event.new_collateral_registry;
    let block = ctx.block.number;
    let count = ctx.chain.get_num_collaterals(registry, block).await?;
    let mut created = 0;

    for index in 0..count {
        let token = ctx.chain.get_collateral(registry, index, block).await?;
        let trove_manager = ctx.chain.get_trove_manager(registry, index, block).await?;
        if token.is_zero() || trove_manager.is_zero() {
            debug!(registry = %registry, index, "Registry list ends early");
            break;
        }

        let collateral_id = Collateral::id_for_index(index);
        if store.load_collateral(&collateral_id).await?.is_some() {
            debug!(collateral_id = %collateral_id, "Collateral already known");
            continue;
        }

        let addresses_registry = ctx.chain.get_addresses_registry(&trove_manager, block).await?;
        let branch = ctx
            .chain
            .get_branch_addresses(&addresses_registry, block)
            .await?;
        let min_coll_ratio = ctx.chain.get_mcr(&branch.borrower_operations, block).await?;

        store
            .save_collateral(&Collateral {
                id: collateral_id.clone(),
                coll_index: index,
                min_coll_ratio,
                created_at_block: block,
            })
            .await?;

        let addresses = CollateralAddresses {
            id: collateral_id.clone(),
            collateral_id: collateral_id.clone(),
            token,
            borrower_operations: branch.borrower_operations,
            sorted_troves: branch.sorted_troves,
            stability_pool: branch.stability_pool,
            trove_manager,
            trove_nft: branch.trove_nft,
            trove_manager_events_emitter: branch.trove_manager_events_emitter,
            liquidation_manager: branch.liquidation_manager,
            redemption_manager: branch.redemption_manager,
            batch_manager: branch.batch_manager,
        };
        store.save_collateral_addresses(&addresses).await?;

        let sources = [
            (
                SourceTemplate::TroveManagerEventsEmitter,
                &addresses.trove_manager_events_emitter,
            ),
            (SourceTemplate::TroveNft, &addresses.trove_nft),
            (SourceTemplate::BatchManager, &addresses.batch_manager),
            (SourceTemplate::StabilityPool, &addresses.stability_pool),
        ];
        for (template, address) in sources {
            store
                .register_source(template, address, Some(&collateral_id), block)
                .await?;
        }

        info!(
            collateral_id = %collateral_id,
            token = %addresses.token,
            trove_manager = %addresses.trove_manager,
            block,
            "Collateral branch registered"
        );
        created += 1;
    }

    Ok(created)
}
