mod common;

use common::*;
use trove_indexer::domain::{Address, TroveStatus, U256};
use trove_indexer::IndexerError;

const TROVE: u64 = 7;

#[tokio::test]
async fn test_transfer_moves_ownership_and_counts() {
    let t = setup().await;
    let (alice, bob) = (addr(0xa11ce), addr(0xb0b));
    t.open(10, 100, TROVE, alice.clone(), e18(10), pct(5)).await;

    // The mint that accompanies the open is ignored.
    t.indexer
        .process(&transfer(10, 100, Address::zero(), alice.clone(), TROVE))
        .await
        .unwrap();
    assert_eq!(t.repo.get_borrower(&alice).await.unwrap().unwrap().troves, 1);

    t.indexer
        .process(&transfer(11, 110, alice.clone(), bob.clone(), TROVE))
        .await
        .unwrap();

    let trove = t.trove(TROVE).await;
    assert_eq!(trove.borrower, bob);
    assert_eq!(trove.previous_owner, Some(alice.clone()));

    let alice_info = t.repo.get_borrower(&alice).await.unwrap().unwrap();
    assert_eq!(alice_info.troves, 0);
    assert_eq!(alice_info.troves_on(0), 0);
    assert_eq!(alice_info.next_owner_index(0), 1);

    let bob_info = t.repo.get_borrower(&bob).await.unwrap().unwrap();
    assert_eq!(bob_info.troves, 1);
    assert_eq!(bob_info.next_owner_index(0), 1);

    let owned = t.repo.list_troves_by_borrower(&bob).await.unwrap();
    assert_eq!(owned.len(), 1);
}

#[tokio::test]
async fn test_burn_after_close_does_not_double_count() {
    let t = setup().await;
    let owner = addr(0xa11ce);
    t.open(10, 100, TROVE, owner.clone(), e18(10), pct(5)).await;

    t.set_trove(TROVE, U256::zero(), U256::zero(), U256::zero());
    t.trove_op(11, 200, TROVE, "CloseTrove", U256::zero())
        .await
        .unwrap();
    t.indexer
        .process(&transfer(11, 200, owner.clone(), Address::zero(), TROVE))
        .await
        .unwrap();

    assert_eq!(t.repo.get_borrower(&owner).await.unwrap().unwrap().troves, 0);
    let burned = t.repo.get_borrower(&Address::zero()).await.unwrap().unwrap();
    assert_eq!(burned.troves, 1);

    let trove = t.trove(TROVE).await;
    assert_eq!(trove.status, TroveStatus::Closed);
    assert!(trove.borrower.is_zero());
}

#[tokio::test]
async fn test_burn_after_liquidation_releases_owner() {
    let t = setup().await;
    let owner = addr(0xa11ce);
    t.open(10, 100, TROVE, owner.clone(), e18(10), pct(5)).await;

    t.set_trove(TROVE, U256::zero(), U256::zero(), U256::zero());
    t.trove_op(11, 200, TROVE, "Liquidate", U256::zero())
        .await
        .unwrap();
    t.indexer
        .process(&transfer(11, 200, owner.clone(), Address::zero(), TROVE))
        .await
        .unwrap();

    assert_eq!(t.repo.get_borrower(&owner).await.unwrap().unwrap().troves, 0);
}

#[tokio::test]
async fn test_transfer_of_unknown_trove_fails() {
    let t = setup().await;
    let err = t
        .indexer
        .process(&transfer(10, 100, addr(1), addr(2), 99))
        .await
        .unwrap_err();
    assert!(matches!(err, IndexerError::TroveNotFound(_)));
}

#[tokio::test]
async fn test_transfer_from_non_owner_is_invariant_violation() {
    let t = setup().await;
    t.open(10, 100, TROVE, addr(0xa11ce), e18(10), pct(5)).await;

    let stranger = addr(0x5);
    let err = t
        .indexer
        .process(&transfer(11, 110, stranger.clone(), addr(0xb0b), TROVE))
        .await
        .unwrap_err();
    assert!(matches!(err, IndexerError::Invariant(_)));
    assert!(t.repo.get_borrower(&stranger).await.unwrap().is_none());
    assert_eq!(t.trove(TROVE).await.borrower, addr(0xa11ce));
}
