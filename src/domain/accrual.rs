//! Time-weighted interest accumulator shared by rate brackets and batches.
//!
//! The accumulator tracks a pool of principal earning interest at mixed rates:
//!
//! - `total_debt`: Σ principal
//! - `sum_debt_times_rate_d36`: Σ principal × rate (both 18-decimal, so 36)
//! - `pending_debt_times_one_year_d36`: Σ principal × rate × seconds, interest
//!   accrued since each principal was last realized, not yet divided by a year
//! - `updated_at`: timestamp the pending value was last projected to
//!
//! Between updates pending grows linearly with `sum × dt`, so projecting is
//! exact without visiting individual positions.

use super::uint::{serde_u256, DECIMAL_PRECISION, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seconds per year used for annual rates.
pub const ONE_YEAR: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccrualError {
    #[error("observation at {at} precedes last update at {updated_at}")]
    TimeWentBackwards { updated_at: u64, at: u64 },

    #[error("{field} underflow: {current} - {removed}")]
    Underflow {
        field: &'static str,
        current: U256,
        removed: U256,
    },

    #[error("{field} overflow")]
    Overflow { field: &'static str },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtAccumulator {
    #[serde(with = "serde_u256")]
    pub total_debt: U256,
    #[serde(rename = "sumDebtTimesRateD36", with = "serde_u256")]
    pub sum_debt_times_rate_d36: U256,
    #[serde(rename = "pendingDebtTimesOneYearD36", with = "serde_u256")]
    pub pending_debt_times_one_year_d36: U256,
    pub updated_at: u64,
}

impl DebtAccumulator {
    /// Empty accumulator stamped at `at`.
    pub fn new(at: u64) -> Self {
        DebtAccumulator {
            updated_at: at,
            ..Default::default()
        }
    }

    /// Advance pending accrual to `at`. Never decreases pending.
    pub fn project(&mut self, at: u64) -> Result<(), AccrualError> {
        let elapsed = self.elapsed_since_update(at)?;
        let accrued = mul(self.sum_debt_times_rate_d36, U256::from(elapsed), "pending")?;
        self.pending_debt_times_one_year_d36 =
            add(self.pending_debt_times_one_year_d36, accrued, "pending")?;
        self.updated_at = at;
        Ok(())
    }

    /// Add principal earning `rate` from `at` on.
    pub fn add(&mut self, debt: U256, rate: U256, at: u64) -> Result<(), AccrualError> {
        self.project(at)?;
        let weight = mul(debt, rate, "sumDebtTimesRate")?;
        self.total_debt = add(self.total_debt, debt, "totalDebt")?;
        self.sum_debt_times_rate_d36 = add(self.sum_debt_times_rate_d36, weight, "sumDebtTimesRate")?;
        Ok(())
    }

    /// Remove principal that was earning `rate` since `since`, together with
    /// the interest it accrued in the meantime.
    pub fn remove(
        &mut self,
        debt: U256,
        rate: U256,
        since: u64,
        at: u64,
    ) -> Result<(), AccrualError> {
        if since > at {
            return Err(AccrualError::TimeWentBackwards {
                updated_at: since,
                at,
            });
        }
        self.project(at)?;

        let weight = mul(debt, rate, "sumDebtTimesRate")?;
        let own_accrual = mul(weight, U256::from(at - since), "pending")?;

        self.pending_debt_times_one_year_d36 =
            sub(self.pending_debt_times_one_year_d36, own_accrual, "pending")?;
        self.sum_debt_times_rate_d36 = sub(self.sum_debt_times_rate_d36, weight, "sumDebtTimesRate")?;
        self.total_debt = sub(self.total_debt, debt, "totalDebt")?;
        Ok(())
    }

    /// Unrealized interest at `at`, in 18-decimal units.
    pub fn pending_interest_at(&self, at: u64) -> Result<U256, AccrualError> {
        let elapsed = self.elapsed_since_update(at)?;
        let accrued = mul(self.sum_debt_times_rate_d36, U256::from(elapsed), "pending")?;
        let pending = add(self.pending_debt_times_one_year_d36, accrued, "pending")?;
        let denominator = U256::from(ONE_YEAR) * U256::from(DECIMAL_PRECISION);
        Ok(pending / denominator)
    }

    pub fn is_empty(&self) -> bool {
        self.total_debt.is_zero() && self.sum_debt_times_rate_d36.is_zero()
    }

    fn elapsed_since_update(&self, at: u64) -> Result<u64, AccrualError> {
        at.checked_sub(self.updated_at)
            .ok_or(AccrualError::TimeWentBackwards {
                updated_at: self.updated_at,
                at,
            })
    }
}

fn add(a: U256, b: U256, field: &'static str) -> Result<U256, AccrualError> {
    a.checked_add(b).ok_or(AccrualError::Overflow { field })
}

fn sub(a: U256, b: U256, field: &'static str) -> Result<U256, AccrualError> {
    a.checked_sub(b).ok_or(AccrualError::Underflow {
        field,
        current: a,
        removed: b,
    })
}

fn mul(a: U256, b: U256, field: &'static str) -> Result<U256, AccrualError> {
    a.checked_mul(b).ok_or(AccrualError::Overflow { field })
}
