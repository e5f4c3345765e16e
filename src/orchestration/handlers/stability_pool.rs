//! `DepositOperation`: stability-pool positions and points.

use super::HandlerContext;
use crate::db::Store;
use crate::domain::events::DepositOperationEvent;
use crate::domain::{sp_position_id, PointsUser, SpOperation};
use crate::engine::points::{
    apply_claim_all, apply_provide, apply_withdraw, open_position, refresh_position,
    summarize_user,
};
use crate::error::IndexerError;
use tracing::debug;

pub async fn handle_deposit_operation(
    store: &mut Store,
    ctx: &HandlerContext<'_>,
    event: &DepositOperationEvent,
) -> Result<(), IndexerError> {
    let operation: SpOperation = event
        .operation
        .parse()
        .map_err(IndexerError::UnsupportedOperation)?;
    let at = ctx.timestamp();
    let user = &event.depositor;
    let pool = &ctx.source.address;
    let id = sp_position_id(user, pool);

    let existing = store.load_sp_position(&id).await?;
    let position = match (operation, existing) {
        (SpOperation::ProvideToSp, None) => open_position(user.clone(), pool.clone(), event, at),
        (SpOperation::ProvideToSp, Some(mut position)) => {
            apply_provide(&mut position, event, at)?;
            position
        }
        (SpOperation::WithdrawFromSp, Some(mut position)) => {
            apply_withdraw(&mut position, event, at)?;
            position
        }
        (SpOperation::ClaimAllCollGains, Some(mut position)) => {
            apply_claim_all(&mut position, at)?;
            position
        }
        (_, None) => return Err(IndexerError::PositionNotFound(id)),
    };
    store.save_sp_position(&position).await?;

    let mut points_user = store
        .load_points_user(user)
        .await?
        .unwrap_or_else(|| PointsUser::new(user.clone(), at));
    points_user.track_position(&id);

    let mut positions = Vec::with_capacity(points_user.sp_positions.len());
    for position_id in &points_user.sp_positions {
        let mut position = store
            .load_sp_position(position_id)
            .await?
            .ok_or_else(|| IndexerError::PositionNotFound(position_id.clone()))?;
        let weight = ctx
            .weights
            .weight_for(&position.pool)
            .ok_or_else(|| IndexerError::MissingPointsWeight(position.pool.clone()))?;
        refresh_position(&mut position, weight, at)?;
        store.save_sp_position(&position).await?;
        positions.push(position);
    }

    summarize_user(&mut points_user, &positions, at)?;
    store.save_points_user(&points_user).await?;

    debug!(
        user = %user,
        pool = %pool,
        operation = ?operation,
        value = %position.value,
        total_points = %points_user.total_points,
        "Stability pool deposit updated"
    );
    Ok(())
}
