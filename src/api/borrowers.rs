use crate::api::AppState;
use crate::domain::{Address, BorrowerInfo, Trove};
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowerResponse {
    #[serde(flatten)]
    pub info: BorrowerInfo,
    pub trove_list: Vec<Trove>,
}

/// `GET /v1/borrowers/{address}`: counters plus the troves currently owned.
pub async fn get_borrower(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<BorrowerResponse>, AppError> {
    let address = Address::parse(&address).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let info = state
        .repo
        .get_borrower(&address)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrower {}", address)))?;
    let trove_list = state.repo.list_troves_by_borrower(&address).await?;

    Ok(Json(BorrowerResponse { info, trove_list }))
}
