//! Trove NFT `Transfer`: trove ownership and borrower counters.

use super::borrowers::{decrement_troves, increment_troves};
use super::HandlerContext;
use crate::db::Store;
use crate::domain::events::TransferEvent;
use crate::domain::{trove_full_id, Address, TroveStatus};
use crate::error::IndexerError;
use tracing::debug;

pub async fn handle_transfer(
    store: &mut Store,
    ctx: &HandlerContext<'_>,
    event: &TransferEvent,
) -> Result<(), IndexerError> {
    // Mints are accounted for by the open handler.
    if event.from.is_zero() {
        return Ok(());
    }

    let collateral_id = ctx.collateral_id()?;
    let id = trove_full_id(collateral_id, &Address::from(event.token_id));
    let mut trove = store
        .load_trove(&id)
        .await?
        .ok_or_else(|| IndexerError::TroveNotFound(id.clone()))?;
    let coll_index = ctx.branch_index(store).await?;

    // Close already released the owner's slot.
    if trove.status != TroveStatus::Closed {
        decrement_troves(store, &event.from, coll_index).await?;
    }
    increment_troves(store, &event.to, coll_index).await?;

    trove.previous_owner = Some(event.from.clone());
    trove.borrower = event.to.clone();
    store.save_trove(&trove).await?;

    debug!(trove = %id, from = %event.from, to = %event.to, "Trove transferred");
    Ok(())
}
