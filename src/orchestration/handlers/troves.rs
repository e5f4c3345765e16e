//! `TroveOperation`: the trove lifecycle.

use super::borrowers::{decrement_troves, increment_troves};
use super::HandlerContext;
use crate::db::Store;
use crate::domain::events::TroveOperationEvent;
use crate::domain::{
    batch_full_id, trove_full_id, Address, CollateralAddresses, Operation, Trove, TroveStatus,
    U256,
};
use crate::engine::{
    apply_principal_rate_change, ensure_not_terminal, record_redemption, touch_by_user,
    LeverageUpdate, PrincipalRateChange,
};
use crate::error::IndexerError;
use tracing::{debug, info};

pub async fn handle_trove_operation(
    store: &mut Store,
    ctx: &HandlerContext<'_>,
    event: &TroveOperationEvent,
) -> Result<(), IndexerError> {
    let operation: Operation = event
        .operation
        .parse()
        .map_err(IndexerError::UnsupportedOperation)?;
    let addresses = ctx.branch_addresses(store).await?;
    let trove_id = Address::from(event.trove_id);
    let id = trove_full_id(&addresses.collateral_id, &trove_id);
    let at = ctx.timestamp();

    debug!(trove = %id, operation = %operation, block = ctx.block.number, "Trove operation");

    match operation {
        Operation::OpenTrove => {
            open_trove(store, ctx, &addresses, event.trove_id, &id).await?;
        }
        Operation::OpenTroveAndJoinBatch => {
            let mut trove = open_trove(store, ctx, &addresses, event.trove_id, &id).await?;
            let manager = batch_manager_of(ctx, &addresses, event.trove_id).await?;
            enter_batch(store, &mut trove, &manager, at).await?;
            store.save_trove(&trove).await?;
        }
        Operation::AdjustTrove => {
            let mut trove = load_live_trove(store, &id).await?;
            let leverage = LeverageUpdate::infer(ctx.receipt, ctx.flash_loan_key);
            update_trove(store, ctx, &addresses, &mut trove, leverage).await?;
            touch_by_user(&mut trove, at);
            store.save_trove(&trove).await?;
        }
        Operation::AdjustTroveInterestRate => {
            let mut trove = load_live_trove(store, &id).await?;
            if trove.is_batch_managed() {
                return Err(IndexerError::BatchManaged(id));
            }
            let leverage = LeverageUpdate::infer(ctx.receipt, ctx.flash_loan_key);
            update_trove(store, ctx, &addresses, &mut trove, leverage).await?;
            touch_by_user(&mut trove, at);
            store.save_trove(&trove).await?;
        }
        Operation::ApplyPendingDebt => {
            let mut trove = load_live_trove(store, &id).await?;
            update_trove(store, ctx, &addresses, &mut trove, LeverageUpdate::Unchanged).await?;
            store.save_trove(&trove).await?;
        }
        Operation::RedeemCollateral => {
            let mut trove = load_live_trove(store, &id).await?;
            update_trove(store, ctx, &addresses, &mut trove, LeverageUpdate::Unchanged).await?;
            record_redemption(
                &mut trove,
                event.coll_change_from_operation.abs,
                event.debt_change_from_operation.abs,
            )?;
            store.save_trove(&trove).await?;
        }
        Operation::SetInterestBatchManager => {
            let mut trove = load_live_trove(store, &id).await?;
            let manager = batch_manager_of(ctx, &addresses, event.trove_id).await?;
            enter_batch(store, &mut trove, &manager, at).await?;
            touch_by_user(&mut trove, at);
            store.save_trove(&trove).await?;
        }
        Operation::RemoveFromBatch => {
            let mut trove = load_live_trove(store, &id).await?;
            leave_batch(store, &mut trove, event.annual_interest_rate, at).await?;
            touch_by_user(&mut trove, at);
            store.save_trove(&trove).await?;
        }
        Operation::CloseTrove => {
            let mut trove = load_live_trove(store, &id).await?;
            update_trove(store, ctx, &addresses, &mut trove, LeverageUpdate::Unchanged).await?;
            if trove.is_batch_managed() {
                leave_batch(store, &mut trove, U256::zero(), at).await?;
            }
            let coll_index = ctx.branch_index(store).await?;
            decrement_troves(store, &trove.borrower, coll_index).await?;
            touch_by_user(&mut trove, at);
            trove.closed_at = Some(at);
            trove.status = TroveStatus::Closed;
            store.save_trove(&trove).await?;
            info!(trove = %id, borrower = %trove.borrower, "Trove closed");
        }
        Operation::Liquidate => {
            let mut trove = load_live_trove(store, &id).await?;
            update_trove(store, ctx, &addresses, &mut trove, LeverageUpdate::Unchanged).await?;
            if trove.is_batch_managed() {
                leave_batch(store, &mut trove, U256::zero(), at).await?;
            }
            trove.debt = event.debt_increase_from_redist;
            trove.deposit = event.coll_increase_from_redist;
            trove.closed_at = Some(at);
            trove.status = TroveStatus::Liquidated;
            store.save_trove(&trove).await?;
            info!(trove = %id, borrower = %trove.borrower, "Trove liquidated");
        }
    }

    Ok(())
}

async fn load_live_trove(store: &mut Store, id: &str) -> Result<Trove, IndexerError> {
    let trove = store
        .load_trove(id)
        .await?
        .ok_or_else(|| IndexerError::TroveNotFound(id.to_string()))?;
    ensure_not_terminal(&trove)?;
    Ok(trove)
}

async fn batch_manager_of(
    ctx: &HandlerContext<'_>,
    addresses: &CollateralAddresses,
    trove_id: U256,
) -> Result<Address, IndexerError> {
    let record = ctx
        .chain
        .get_trove(&addresses.trove_manager, trove_id, ctx.block.number)
        .await?;
    if record.interest_batch_manager.is_zero() {
        return Err(IndexerError::Invariant(format!(
            "trove {} reports no batch manager at block {}",
            Address::from(trove_id),
            ctx.block.number
        )));
    }
    Ok(record.interest_batch_manager)
}

async fn open_trove(
    store: &mut Store,
    ctx: &HandlerContext<'_>,
    addresses: &CollateralAddresses,
    raw_trove_id: U256,
    id: &str,
) -> Result<Trove, IndexerError> {
    if store.load_trove(id).await?.is_some() {
        return Err(IndexerError::TroveAlreadyExists(id.to_string()));
    }

    let at = ctx.timestamp();
    let owner = ctx
        .chain
        .owner_of(&addresses.trove_nft, raw_trove_id, ctx.block.number)
        .await?;

    let mut trove = Trove {
        id: id.to_string(),
        trove_id: Address::from(raw_trove_id),
        collateral_id: addresses.collateral_id.clone(),
        borrower: owner,
        previous_owner: None,
        debt: U256::zero(),
        deposit: U256::zero(),
        stake: U256::zero(),
        interest_rate: U256::zero(),
        interest_batch: None,
        status: TroveStatus::Active,
        created_at: at,
        updated_at: at,
        closed_at: None,
        last_user_action_at: at,
        redemption_count: 0,
        redeemed_coll: U256::zero(),
        redeemed_debt: U256::zero(),
        might_be_leveraged: false,
        leverage_tx_hash: None,
    };

    let leverage = LeverageUpdate::infer(ctx.receipt, ctx.flash_loan_key);
    update_trove(store, ctx, addresses, &mut trove, leverage).await?;
    store.save_trove(&trove).await?;

    let coll_index = ctx.branch_index(store).await?;
    increment_troves(store, &trove.borrower, coll_index).await?;

    info!(
        trove = %id,
        borrower = %trove.borrower,
        debt = %trove.debt,
        rate = %trove.interest_rate,
        "Trove opened"
    );
    Ok(trove)
}

/// Re-read the trove from the trove manager and move its principal between
/// brackets. Batch-managed troves keep a zero rate and touch no bracket.
async fn update_trove(
    store: &mut Store,
    ctx: &HandlerContext<'_>,
    addresses: &CollateralAddresses,
    trove: &mut Trove,
    leverage: LeverageUpdate,
) -> Result<(), IndexerError> {
    let at = ctx.timestamp();
    let raw_trove_id = trove.trove_id.to_u256();

    let latest = ctx
        .chain
        .get_latest_trove_data(&addresses.trove_manager, raw_trove_id, ctx.block.number)
        .await?;
    let record = ctx
        .chain
        .get_trove(&addresses.trove_manager, raw_trove_id, ctx.block.number)
        .await?;

    if trove.is_batch_managed() {
        trove.interest_rate = U256::zero();
    } else {
        apply_principal_rate_change(
            store,
            &PrincipalRateChange {
                collateral_id: &addresses.collateral_id,
                prev_rate: trove.interest_rate,
                new_rate: latest.annual_interest_rate,
                prev_debt: trove.debt,
                new_debt: latest.entire_debt,
                prev_observed_at: trove.updated_at,
                observed_at: at,
            },
        )
        .await?;
        trove.interest_rate = latest.annual_interest_rate;
    }

    trove.debt = latest.entire_debt;
    trove.deposit = latest.entire_coll;
    trove.stake = record.stake;
    leverage.apply(trove, ctx.tx_hash);
    trove.updated_at = at;
    Ok(())
}

/// Hand the trove's principal over to the batch: its bracket share is
/// removed and its own rate zeroed.
pub async fn enter_batch(
    store: &mut Store,
    trove: &mut Trove,
    batch_manager: &Address,
    at: u64,
) -> Result<(), IndexerError> {
    apply_principal_rate_change(
        store,
        &PrincipalRateChange {
            collateral_id: &trove.collateral_id,
            prev_rate: trove.interest_rate,
            new_rate: U256::zero(),
            prev_debt: trove.debt,
            new_debt: U256::zero(),
            prev_observed_at: trove.updated_at,
            observed_at: at,
        },
    )
    .await?;

    let batch = batch_full_id(&trove.collateral_id, batch_manager);
    debug!(trove = %trove.id, batch = %batch, "Trove entered batch");
    trove.interest_batch = Some(batch);
    trove.interest_rate = U256::zero();
    trove.updated_at = at;
    Ok(())
}

/// Take the trove out of its batch at `rate`. A zero rate (close,
/// liquidation) puts it in no bracket.
pub async fn leave_batch(
    store: &mut Store,
    trove: &mut Trove,
    rate: U256,
    at: u64,
) -> Result<(), IndexerError> {
    if !trove.is_batch_managed() {
        return Err(IndexerError::NotInBatch(trove.id.clone()));
    }

    apply_principal_rate_change(
        store,
        &PrincipalRateChange {
            collateral_id: &trove.collateral_id,
            prev_rate: U256::zero(),
            new_rate: rate,
            prev_debt: U256::zero(),
            new_debt: trove.debt,
            prev_observed_at: trove.updated_at,
            observed_at: at,
        },
    )
    .await?;

    debug!(trove = %trove.id, batch = ?trove.interest_batch, rate = %rate, "Trove left batch");
    trove.interest_batch = None;
    trove.interest_rate = rate;
    trove.status = TroveStatus::Active;
    trove.updated_at = at;
    Ok(())
}
