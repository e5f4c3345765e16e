//! Status and bookkeeping rules of the trove lifecycle.

use crate::domain::{Address, Receipt, Trove, TroveStatus, U256};
use crate::error::IndexerError;

/// How a refresh should treat the trove's leverage flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeverageUpdate {
    Yes,
    No,
    Unchanged,
}

impl LeverageUpdate {
    /// A flash loan anywhere in the transaction marks the trove as possibly
    /// leveraged.
    pub fn infer(receipt: Option<&Receipt>, flash_loan_key: &Address) -> Self {
        let flash_loaned = receipt
            .map(|r| {
                r.logs
                    .iter()
                    .any(|log| log.keys.first() == Some(flash_loan_key))
            })
            .unwrap_or(false);

        if flash_loaned {
            LeverageUpdate::Yes
        } else {
            LeverageUpdate::No
        }
    }

    pub fn apply(self, trove: &mut Trove, tx_hash: Option<&str>) {
        let flag = match self {
            LeverageUpdate::Yes => true,
            LeverageUpdate::No => false,
            LeverageUpdate::Unchanged => return,
        };
        trove.might_be_leveraged = flag;
        trove.leverage_tx_hash = tx_hash.map(str::to_string);
    }
}

pub fn ensure_not_terminal(trove: &Trove) -> Result<(), IndexerError> {
    if trove.status.is_terminal() {
        return Err(IndexerError::TroveTerminal {
            id: trove.id.clone(),
            status: trove.status,
        });
    }
    Ok(())
}

/// Owner-initiated action: reactivates a redeemed trove and clears its
/// redemption counters.
pub fn touch_by_user(trove: &mut Trove, at: u64) {
    trove.status = TroveStatus::Active;
    trove.redemption_count = 0;
    trove.redeemed_coll = U256::zero();
    trove.redeemed_debt = U256::zero();
    trove.last_user_action_at = at;
}

pub fn record_redemption(
    trove: &mut Trove,
    coll_redeemed: U256,
    debt_redeemed: U256,
) -> Result<(), IndexerError> {
    let id = trove.id.clone();
    let overflow = |field: &str| IndexerError::Invariant(format!("{} overflow on {}", field, id));

    trove.redeemed_coll = trove
        .redeemed_coll
        .checked_add(coll_redeemed)
        .ok_or_else(|| overflow("redeemedColl"))?;
    trove.redeemed_debt = trove
        .redeemed_debt
        .checked_add(debt_redeemed)
        .ok_or_else(|| overflow("redeemedDebt"))?;
    trove.redemption_count = trove
        .redemption_count
        .checked_add(1)
        .ok_or_else(|| overflow("redemptionCount"))?;
    trove.status = TroveStatus::Redeemed;
    Ok(())
}
