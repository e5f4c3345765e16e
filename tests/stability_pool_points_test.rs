mod common;

use common::*;
use trove_indexer::chain::BranchAddresses;
use trove_indexer::domain::{sp_position_id, U256};
use trove_indexer::engine::{PointsError, PointsWeights};
use trove_indexer::IndexerError;

const DEPOSITOR: u64 = 0xd0d0;

fn weights() -> PointsWeights {
    PointsWeights::default().with_weight(addr(STABILITY_POOL), e18(2))
}

#[tokio::test]
async fn test_points_accrue_between_deposit_operations() {
    let t = setup_with_weights(weights()).await;
    let user = addr(DEPOSITOR);
    let position_id = sp_position_id(&user, &addr(STABILITY_POOL));

    t.indexer
        .process(&sp_envelope(20, 1000, deposit_operation(user.clone(), "provide_to_sp", e18(100))))
        .await
        .unwrap();
    let position = t.repo.get_sp_position(&position_id).await.unwrap().unwrap();
    assert_eq!(position.value, e18(100));
    assert_eq!(position.earning_rate, e18(200));
    assert!(position.points_earned.is_zero());

    t.indexer
        .process(&sp_envelope(21, 1010, deposit_operation(user.clone(), "provide_to_sp", e18(50))))
        .await
        .unwrap();
    let position = t.repo.get_sp_position(&position_id).await.unwrap().unwrap();
    assert_eq!(position.value, e18(150));
    assert_eq!(position.points_earned, e18(2000));
    assert_eq!(position.earning_rate, e18(300));
    assert_eq!(position.last_update_time, 1010);

    let points_user = t.repo.get_points_user(&user).await.unwrap().unwrap();
    assert_eq!(points_user.total_points, e18(2000));
    assert_eq!(points_user.total_value, e18(150));
    assert_eq!(points_user.total_rate, e18(300));
    assert_eq!(points_user.sp_positions, vec![position_id.clone()]);

    // Withdrawing more than the position holds is rejected as a whole.
    let err = t
        .indexer
        .process(&sp_envelope(22, 1020, deposit_operation(user.clone(), "withdraw_from_sp", e18(200))))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IndexerError::Points(PointsError::WithdrawalExceedsValue { .. })
    ));
    assert_eq!(
        t.repo.get_sp_position(&position_id).await.unwrap().unwrap(),
        position
    );

    t.indexer
        .process(&sp_envelope(23, 1020, deposit_operation(user.clone(), "withdraw_from_sp", e18(50))))
        .await
        .unwrap();
    let position = t.repo.get_sp_position(&position_id).await.unwrap().unwrap();
    assert_eq!(position.value, e18(100));
    assert_eq!(position.points_earned, e18(5000));

    t.indexer
        .process(&sp_envelope(24, 1030, deposit_operation(user.clone(), "claim_all_coll_gains", U256::zero())))
        .await
        .unwrap();
    let position = t.repo.get_sp_position(&position_id).await.unwrap().unwrap();
    assert!(position.value.is_zero());
    assert!(position.earning_rate.is_zero());
    assert_eq!(position.points_earned, e18(7000));

    let points_user = t.repo.get_points_user(&user).await.unwrap().unwrap();
    assert_eq!(points_user.total_points, e18(7000));
    assert!(points_user.total_rate.is_zero());
    assert_eq!(points_user.last_update_time, 1030);
}

#[tokio::test]
async fn test_user_totals_cover_every_pool() {
    let second_pool = addr(0x703);
    let t = setup_unbootstrapped(weights().with_weight(second_pool.clone(), e18(1))).await;
    t.chain
        .push_collateral(&addr(REGISTRY), addr(0x301), addr(0x401));
    t.chain.set_branch(
        &addr(0x401),
        addr(0x501),
        BranchAddresses {
            borrower_operations: addr(0x701),
            sorted_troves: addr(0x702),
            stability_pool: second_pool.clone(),
            trove_manager_events_emitter: addr(0x704),
            trove_nft: addr(0x705),
            liquidation_manager: addr(0x706),
            redemption_manager: addr(0x707),
            batch_manager: addr(0x708),
        },
        U256::from(1_200_000_000_000_000_000u64),
    );
    t.indexer
        .process(&registry_changed(BOOTSTRAP_BLOCK, REGISTRY))
        .await
        .unwrap();
    assert_eq!(t.repo.list_collaterals().await.unwrap().len(), 2);

    let user = addr(DEPOSITOR);
    t.indexer
        .process(&sp_envelope(20, 1000, deposit_operation(user.clone(), "provide_to_sp", e18(100))))
        .await
        .unwrap();

    let mut second = sp_envelope(21, 1100, deposit_operation(user.clone(), "provide_to_sp", e18(10)));
    second.from_address = second_pool.clone();
    t.indexer.process(&second).await.unwrap();

    let first = t
        .repo
        .get_sp_position(&sp_position_id(&user, &addr(STABILITY_POOL)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.points_earned, e18(20_000));
    assert_eq!(first.last_update_time, 1100);

    let points_user = t.repo.get_points_user(&user).await.unwrap().unwrap();
    assert_eq!(points_user.sp_positions.len(), 2);
    assert_eq!(points_user.total_value, e18(110));
    assert_eq!(points_user.total_rate, e18(210));
    assert_eq!(points_user.total_points, e18(20_000));
}

#[tokio::test]
async fn test_missing_weight_rolls_back_the_deposit() {
    let t = setup_with_weights(PointsWeights::default()).await;
    let user = addr(DEPOSITOR);

    let err = t
        .indexer
        .process(&sp_envelope(20, 1000, deposit_operation(user.clone(), "provide_to_sp", e18(1))))
        .await
        .unwrap_err();
    assert!(matches!(err, IndexerError::MissingPointsWeight(pool) if pool == addr(STABILITY_POOL)));
    assert!(t
        .repo
        .get_sp_position(&sp_position_id(&user, &addr(STABILITY_POOL)))
        .await
        .unwrap()
        .is_none());
    assert!(t.repo.get_points_user(&user).await.unwrap().is_none());
}

#[tokio::test]
async fn test_withdraw_and_claim_need_a_position() {
    let t = setup_with_weights(weights()).await;
    for operation in ["withdraw_from_sp", "claim_all_coll_gains"] {
        let err = t
            .indexer
            .process(&sp_envelope(20, 1000, deposit_operation(addr(DEPOSITOR), operation, e18(1))))
            .await
            .unwrap_err();
        assert!(matches!(err, IndexerError::PositionNotFound(_)));
    }
}

#[tokio::test]
async fn test_unknown_deposit_operation_is_unsupported() {
    let t = setup_with_weights(weights()).await;
    let err = t
        .indexer
        .process(&sp_envelope(20, 1000, deposit_operation(addr(DEPOSITOR), "stake", e18(1))))
        .await
        .unwrap_err();
    assert!(matches!(err, IndexerError::UnsupportedOperation(op) if op == "stake"));
}
