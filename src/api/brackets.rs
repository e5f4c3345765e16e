//! Interest-rate brackets of one collateral branch.

use crate::api::{decimal_string, projection_time, AppState};
use crate::domain::{InterestRateBracket, U256};
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ProjectionQuery {
    /// Unix seconds to project pending interest to.
    pub at: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketView {
    #[serde(flatten)]
    pub bracket: InterestRateBracket,
    pub pending_interest: String,
    pub projected_at: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketsResponse {
    pub collateral_id: String,
    pub total_debt: String,
    pub brackets: Vec<BracketView>,
}

/// `GET /v1/collaterals/{id}/brackets`
pub async fn get_collateral_brackets(
    Path(collateral_id): Path<String>,
    Query(params): Query<ProjectionQuery>,
    State(state): State<AppState>,
) -> Result<Json<BracketsResponse>, AppError> {
    if state.repo.get_collateral(&collateral_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Collateral {}", collateral_id)));
    }

    let brackets = state.repo.list_brackets(&collateral_id).await?;
    let mut total_debt = U256::zero();
    let mut views = Vec::with_capacity(brackets.len());

    for bracket in brackets {
        let at = projection_time(params.at, bracket.accrual.updated_at);
        let pending = bracket
            .accrual
            .pending_interest_at(at)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        total_debt = total_debt.saturating_add(bracket.accrual.total_debt);
        views.push(BracketView {
            bracket,
            pending_interest: decimal_string(pending),
            projected_at: at,
        });
    }

    Ok(Json(BracketsResponse {
        collateral_id,
        total_debt: decimal_string(total_debt),
        brackets: views,
    }))
}
