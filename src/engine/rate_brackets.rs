//! Moves principal between interest-rate brackets as trove rates change.

use crate::db::Store;
use crate::domain::{bracket_id, bracket_rate, InterestRateBracket, U256};
use crate::error::IndexerError;
use tracing::debug;

/// One principal/rate transition of a non-batched trove.
///
/// A zero rate on either side means "batch-managed or nonexistent" and that
/// side is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalRateChange<'a> {
    pub collateral_id: &'a str,
    pub prev_rate: U256,
    pub new_rate: U256,
    pub prev_debt: U256,
    pub new_debt: U256,
    /// When `prev_debt` was last realized (the trove's `updated_at`).
    pub prev_observed_at: u64,
    pub observed_at: u64,
}

/// Apply `change` to the branch's brackets inside the event's transaction.
pub async fn apply_principal_rate_change(
    store: &mut Store,
    change: &PrincipalRateChange<'_>,
) -> Result<(), IndexerError> {
    let mut current: Option<InterestRateBracket> = None;

    if !change.prev_rate.is_zero() {
        let id = bracket_id(change.collateral_id, bracket_rate(change.prev_rate));
        let mut bracket = store
            .load_bracket(&id)
            .await?
            .ok_or(IndexerError::BracketNotFound(id))?;
        bracket.accrual.remove(
            change.prev_debt,
            change.prev_rate,
            change.prev_observed_at,
            change.observed_at,
        )?;
        current = Some(bracket);
    }

    if !change.new_rate.is_zero() {
        let floored = bracket_rate(change.new_rate);
        let id = bracket_id(change.collateral_id, floored);

        let mut bracket = match current.take() {
            Some(prev) if prev.id == id => prev,
            prev => {
                if let Some(prev) = prev {
                    store.save_bracket(&prev).await?;
                }
                match store.load_bracket(&id).await? {
                    Some(existing) => existing,
                    None => {
                        InterestRateBracket::new(change.collateral_id, floored, change.observed_at)
                    }
                }
            }
        };
        bracket
            .accrual
            .add(change.new_debt, change.new_rate, change.observed_at)?;
        current = Some(bracket);
    }

    if let Some(bracket) = current {
        store.save_bracket(&bracket).await?;
    }

    debug!(
        collateral_id = change.collateral_id,
        prev_rate = %change.prev_rate,
        new_rate = %change.new_rate,
        prev_debt = %change.prev_debt,
        new_debt = %change.new_debt,
        at = change.observed_at,
        "Applied principal rate change"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::test_support::setup_test_repo;
    use crate::domain::DECIMAL_PRECISION;

    fn e18(n: u64) -> U256 {
        U256::from(n) * U256::from(DECIMAL_PRECISION)
    }

    fn pct(n: u64) -> U256 {
        U256::from(n) * U256::from(10_000_000_000_000_000u64)
    }

    fn change(prev_rate: U256, new_rate: U256, prev: U256, new: U256, since: u64, at: u64) -> PrincipalRateChange<'static> {
        PrincipalRateChange {
            collateral_id: "0",
            prev_rate,
            new_rate,
            prev_debt: prev,
            new_debt: new,
            prev_observed_at: since,
            observed_at: at,
        }
    }

    #[tokio::test]
    async fn test_move_between_brackets() {
        let (repo, _dir) = setup_test_repo().await;
        let mut store = repo.begin().await.unwrap();

        apply_principal_rate_change(&mut store, &change(U256::zero(), pct(5), U256::zero(), e18(1000), 100, 100))
            .await
            .unwrap();
        apply_principal_rate_change(&mut store, &change(pct(5), pct(7), e18(1000), e18(1000), 100, 200))
            .await
            .unwrap();
        store.commit().await.unwrap();

        let brackets = repo.list_brackets("0").await.unwrap();
        assert_eq!(brackets.len(), 2);
        assert_eq!(brackets[0].rate, pct(5));
        assert_eq!(brackets[0].accrual.total_debt, U256::zero());
        assert_eq!(brackets[0].accrual.pending_debt_times_one_year_d36, U256::zero());
        assert_eq!(brackets[0].accrual.updated_at, 200);
        assert_eq!(brackets[1].rate, pct(7));
        assert_eq!(brackets[1].accrual.total_debt, e18(1000));
    }

    #[tokio::test]
    async fn test_same_bracket_update_saves_once_consistently() {
        let (repo, _dir) = setup_test_repo().await;
        let mut store = repo.begin().await.unwrap();

        let rate = pct(5);
        let nudged = rate + U256::from(1u64);
        apply_principal_rate_change(&mut store, &change(U256::zero(), rate, U256::zero(), e18(10), 0, 0))
            .await
            .unwrap();
        apply_principal_rate_change(&mut store, &change(rate, nudged, e18(10), e18(12), 0, 50))
            .await
            .unwrap();
        store.commit().await.unwrap();

        let brackets = repo.list_brackets("0").await.unwrap();
        assert_eq!(brackets.len(), 1);
        assert_eq!(brackets[0].accrual.total_debt, e18(12));
        assert_eq!(brackets[0].accrual.sum_debt_times_rate_d36, e18(12) * nudged);
    }

    #[tokio::test]
    async fn test_missing_prev_bracket_is_error() {
        let (repo, _dir) = setup_test_repo().await;
        let mut store = repo.begin().await.unwrap();
        let err = apply_principal_rate_change(&mut store, &change(pct(5), pct(6), e18(1), e18(1), 0, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, IndexerError::BracketNotFound(_)));
    }

    #[tokio::test]
    async fn test_zero_rates_touch_nothing() {
        let (repo, _dir) = setup_test_repo().await;
        let mut store = repo.begin().await.unwrap();
        apply_principal_rate_change(&mut store, &change(U256::zero(), U256::zero(), e18(1), e18(1), 0, 10))
            .await
            .unwrap();
        store.commit().await.unwrap();
        assert!(repo.list_brackets("0").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_backwards_time_is_error() {
        let (repo, _dir) = setup_test_repo().await;
        let mut store = repo.begin().await.unwrap();
        apply_principal_rate_change(&mut store, &change(U256::zero(), pct(5), U256::zero(), e18(1), 100, 100))
            .await
            .unwrap();
        let err = apply_principal_rate_change(&mut store, &change(U256::zero(), pct(5), U256::zero(), e18(1), 50, 50))
            .await
            .unwrap_err();
        assert!(matches!(err, IndexerError::Accrual(_)));
    }
}
