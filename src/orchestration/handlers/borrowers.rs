//! Per-borrower trove counters.

use crate::db::Store;
use crate::domain::{Address, BorrowerInfo};
use crate::error::IndexerError;
use tracing::debug;

pub async fn increment_troves(
    store: &mut Store,
    borrower: &Address,
    coll_index: u32,
) -> Result<(), IndexerError> {
    let mut info = store
        .load_borrower(borrower)
        .await?
        .unwrap_or_else(|| BorrowerInfo::new(borrower.clone()));
    info.add_trove(coll_index);
    store.save_borrower(&info).await?;

    debug!(borrower = %borrower, coll_index, troves = info.troves, "Borrower trove added");
    Ok(())
}

pub async fn decrement_troves(
    store: &mut Store,
    borrower: &Address,
    coll_index: u32,
) -> Result<(), IndexerError> {
    let mut info = store
        .load_borrower(borrower)
        .await?
        .unwrap_or_else(|| BorrowerInfo::new(borrower.clone()));
    info.remove_trove(coll_index)?;
    store.save_borrower(&info).await?;

    debug!(borrower = %borrower, coll_index, troves = info.troves, "Borrower trove removed");
    Ok(())
}
