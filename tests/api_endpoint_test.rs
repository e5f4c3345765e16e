mod common;

use axum::http::StatusCode;
use common::*;
use std::sync::Arc;
use tower::util::ServiceExt;
use trove_indexer::api;
use trove_indexer::domain::ONE_YEAR;

fn app(t: &TestIndexer) -> axum::Router {
    api::create_router(api::AppState::new(Arc::new(t.repo.clone())))
}

async fn request(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health_and_ready() {
    let t = setup().await;

    let (status, body) = request(app(&t), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = request(app(&t), "/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_trove_lookup_normalizes_the_id() {
    let t = setup().await;
    t.open(10, 100, 1, addr(0xa), e18(1000), pct(5)).await;

    let (status, body) = request(app(&t), "/v1/troves/0:0x1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], format!("0:{}", addr(1)));
    assert_eq!(body["borrower"], addr(0xa).to_string());
    assert_eq!(body["debt"], e18(1000).to_string());
    assert_eq!(body["interestRate"], pct(5).to_string());
    assert_eq!(body["status"], "active");
    assert_eq!(body["createdAt"], 100);

    // Decimal spelling of the same trove id.
    let (status, body) = request(app(&t), "/v1/troves/0:1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], format!("0:{}", addr(1)));
}

#[tokio::test]
async fn test_trove_lookup_errors() {
    let t = setup().await;

    let (status, body) = request(app(&t), "/v1/troves/0:0x99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("Trove"));

    let (status, _) = request(app(&t), "/v1/troves/0x99").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(app(&t), "/v1/troves/x:0x99").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = request(app(&t), "/v1/troves/0:0xzz").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_brackets_with_projected_interest() {
    let t = setup().await;
    t.open(10, 0, 1, addr(0xa), e18(1000), pct(5)).await;
    t.open(11, 0, 2, addr(0xb), e18(500), pct(8)).await;

    let uri = format!("/v1/collaterals/0/brackets?at={}", ONE_YEAR);
    let (status, body) = request(app(&t), &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["collateralId"], "0");
    assert_eq!(body["totalDebt"], e18(1500).to_string());

    let brackets = body["brackets"].as_array().unwrap();
    assert_eq!(brackets.len(), 2);
    let five = brackets
        .iter()
        .find(|b| b["rate"] == pct(5).to_string())
        .unwrap();
    assert_eq!(five["totalDebt"], e18(1000).to_string());
    assert_eq!(five["pendingInterest"], e18(50).to_string());
    assert_eq!(five["projectedAt"], ONE_YEAR);
    let eight = brackets
        .iter()
        .find(|b| b["rate"] == pct(8).to_string())
        .unwrap();
    assert_eq!(eight["pendingInterest"], e18(40).to_string());
}

#[tokio::test]
async fn test_projection_never_precedes_last_update() {
    let t = setup().await;
    t.open(10, 5000, 1, addr(0xa), e18(1000), pct(5)).await;

    let (status, body) = request(app(&t), "/v1/collaterals/0/brackets?at=10").await;
    assert_eq!(status, StatusCode::OK);
    let bracket = &body["brackets"][0];
    assert_eq!(bracket["projectedAt"], 5000);
    assert_eq!(bracket["pendingInterest"], "0");
}

#[tokio::test]
async fn test_brackets_of_unknown_collateral() {
    let t = setup().await;
    let (status, _) = request(app(&t), "/v1/collaterals/7/brackets").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_batch_lookup() {
    let t = setup().await;
    let manager = addr(0x3a7);
    t.indexer
        .process(&batch_updated(10, 0, manager.clone(), e18(1000), pct(10)))
        .await
        .unwrap();

    let uri = format!("/v1/batches/0:0x3a7?at={}", ONE_YEAR);
    let (status, body) = request(app(&t), &uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["batchManager"], manager.to_string());
    assert_eq!(body["totalDebt"], e18(1000).to_string());
    assert_eq!(body["annualInterestRate"], pct(10).to_string());
    assert_eq!(body["pendingInterest"], e18(100).to_string());

    let (status, _) = request(app(&t), "/v1/batches/0:0x3a8").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_borrower_lists_owned_troves() {
    let t = setup().await;
    let alice = addr(0xa);
    t.open(10, 100, 1, alice.clone(), e18(1000), pct(5)).await;
    t.open(11, 110, 2, alice.clone(), e18(200), pct(6)).await;

    let (status, body) = request(app(&t), "/v1/borrowers/0xa").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], alice.to_string());
    assert_eq!(body["troves"], 2);
    assert_eq!(body["trovesByCollateral"]["0"], 2);
    assert_eq!(body["troveList"].as_array().unwrap().len(), 2);

    let (status, _) = request(app(&t), "/v1/borrowers/0xb").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(app(&t), "/v1/borrowers/nope").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
