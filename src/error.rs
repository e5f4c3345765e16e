use crate::chain::ChainError;
use crate::domain::{AccrualError, Address, NegativeTroveCount, SourceTemplate, TroveStatus};
use crate::engine::points::PointsError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors raised while applying one event. The event's transaction is rolled
/// back and the error returned to the caller.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Trove not found: {0}")]
    TroveNotFound(String),
    #[error("Trove already exists: {0}")]
    TroveAlreadyExists(String),
    #[error("Trove {id} is {status}; no further operations are accepted")]
    TroveTerminal { id: String, status: TroveStatus },
    #[error("Collateral not found: {0}")]
    CollateralNotFound(String),
    #[error("Interest rate bracket not found: {0}")]
    BracketNotFound(String),
    #[error("Trove is not in a batch: {0}")]
    NotInBatch(String),
    #[error("Trove is batch-managed: {0}")]
    BatchManaged(String),
    #[error("No source registered for contract {0}")]
    UnknownSource(Address),
    #[error("{event} is not handled by {template} source {address}")]
    EventNotHandled {
        address: Address,
        template: SourceTemplate,
        event: &'static str,
    },
    #[error("Stability pool position not found: {0}")]
    PositionNotFound(String),
    #[error("No points weight configured for pool {0}")]
    MissingPointsWeight(Address),
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("Invariant violation: {0}")]
    Invariant(String),
    #[error("Accrual invariant violation: {0}")]
    Accrual(#[from] AccrualError),
    #[error("Points invariant violation: {0}")]
    Points(#[from] PointsError),
    #[error("Chain read failed: {0}")]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

impl From<NegativeTroveCount> for IndexerError {
    fn from(err: NegativeTroveCount) -> Self {
        IndexerError::Invariant(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
