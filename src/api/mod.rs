pub mod batches;
pub mod borrowers;
pub mod brackets;
pub mod health;
pub mod troves;

use crate::db::Repository;
use crate::domain::{Address, U256};
use crate::error::AppError;
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
}

impl AppState {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/troves/:id", get(troves::get_trove))
        .route(
            "/v1/collaterals/:id/brackets",
            get(brackets::get_collateral_brackets),
        )
        .route("/v1/batches/:id", get(batches::get_batch))
        .route("/v1/borrowers/:address", get(borrowers::get_borrower))
        .layer(cors)
        .with_state(state)
}

/// Normalize `collId:address` path ids to their stored form.
pub(crate) fn parse_composite_id(raw: &str) -> Result<(String, Address), AppError> {
    let (collateral_id, address) = raw
        .split_once(':')
        .ok_or_else(|| AppError::BadRequest(format!("Expected collId:address, got {}", raw)))?;
    if collateral_id.is_empty() || !collateral_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::BadRequest(format!(
            "Invalid collateral id: {}",
            collateral_id
        )));
    }
    let address = Address::parse(address)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    Ok((collateral_id.to_string(), address))
}

/// Interest-projection timestamp: explicit `at`, else now, never before the
/// accumulator's last update.
pub(crate) fn projection_time(requested: Option<u64>, updated_at: u64) -> u64 {
    let at = requested.unwrap_or_else(|| chrono::Utc::now().timestamp().max(0) as u64);
    at.max(updated_at)
}

pub(crate) fn decimal_string(value: U256) -> String {
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_composite_id() {
        let (coll, address) = parse_composite_id("3:0x0abc").unwrap();
        assert_eq!(coll, "3");
        assert_eq!(address, Address::from(0xabcu64));

        assert!(matches!(parse_composite_id("0xabc"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_composite_id("x:0xabc"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_composite_id("1:zz"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_projection_time_never_goes_back() {
        assert_eq!(projection_time(Some(50), 100), 100);
        assert_eq!(projection_time(Some(150), 100), 150);
        assert!(projection_time(None, 0) > 1_600_000_000);
    }
}
