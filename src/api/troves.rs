//! Single trove lookup.

use crate::api::{parse_composite_id, AppState};
use crate::domain::{trove_full_id, Trove};
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::Json;

/// `GET /v1/troves/{collId:troveId}`
pub async fn get_trove(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Trove>, AppError> {
    let (collateral_id, trove_id) = parse_composite_id(&id)?;
    let id = trove_full_id(&collateral_id, &trove_id);

    let trove = state
        .repo
        .get_trove(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Trove {}", id)))?;
    Ok(Json(trove))
}
