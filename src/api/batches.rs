use crate::api::brackets::ProjectionQuery;
use crate::api::{decimal_string, parse_composite_id, projection_time, AppState};
use crate::domain::{batch_full_id, InterestBatch};
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchView {
    #[serde(flatten)]
    pub batch: InterestBatch,
    pub pending_interest: String,
    pub projected_at: u64,
}

/// `GET /v1/batches/{collId:batchManager}`
pub async fn get_batch(
    Path(id): Path<String>,
    Query(params): Query<ProjectionQuery>,
    State(state): State<AppState>,
) -> Result<Json<BatchView>, AppError> {
    let (collateral_id, manager) = parse_composite_id(&id)?;
    let id = batch_full_id(&collateral_id, &manager);

    let batch = state
        .repo
        .get_batch(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Batch {}", id)))?;

    let at = projection_time(params.at, batch.accrual.updated_at);
    let pending = batch
        .accrual
        .pending_interest_at(at)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(BatchView {
        batch,
        pending_interest: decimal_string(pending),
        projected_at: at,
    }))
}
