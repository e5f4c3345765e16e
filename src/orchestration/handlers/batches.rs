//! `BatchUpdated`: batch-level debt accounting.

use super::HandlerContext;
use crate::db::Store;
use crate::domain::events::BatchUpdatedEvent;
use crate::domain::{batch_full_id, InterestBatch};
use crate::error::IndexerError;
use tracing::debug;

/// Realize the batch's interest up to the event and take over the reported
/// debt, coll, rate and fee. Brackets are never touched.
pub async fn handle_batch_updated(
    store: &mut Store,
    ctx: &HandlerContext<'_>,
    event: &BatchUpdatedEvent,
) -> Result<(), IndexerError> {
    let collateral_id = ctx.collateral_id()?;
    let at = ctx.timestamp();
    let id = batch_full_id(collateral_id, &event.interest_batch_manager);

    let mut batch = match store.load_batch(&id).await? {
        Some(batch) => batch,
        None => InterestBatch::new(
            id.clone(),
            collateral_id,
            event.interest_batch_manager.clone(),
            at,
        ),
    };

    let prev_debt = batch.accrual.total_debt;
    let since = batch.accrual.updated_at;
    batch
        .accrual
        .remove(prev_debt, batch.annual_interest_rate, since, at)?;
    batch
        .accrual
        .add(event.debt, event.annual_interest_rate, at)?;

    batch.coll = event.coll;
    batch.annual_interest_rate = event.annual_interest_rate;
    batch.annual_management_fee = event.annual_management_fee;
    store.save_batch(&batch).await?;

    debug!(
        batch = %id,
        prev_debt = %prev_debt,
        debt = %event.debt,
        rate = %event.annual_interest_rate,
        "Batch updated"
    );
    Ok(())
}
