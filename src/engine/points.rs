//! Stability-pool points accrual.
//!
//! A position earns `value × weight / 1e18` points per second, where the
//! weight is configured per pool. Balance changes come from `DepositOperation`
//! events; accrual is settled up to the event timestamp before each change.

use crate::domain::events::DepositOperationEvent;
use crate::domain::{Address, PointsUser, StabilityPoolPosition, DECIMAL_PRECISION, U256};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointsError {
    #[error("time went backwards on {id}: last update {last}, event at {at}")]
    TimeWentBackwards { id: String, last: u64, at: u64 },
    #[error("{field} overflow on {id}")]
    Overflow { id: String, field: &'static str },
    #[error("{field} underflow on {id}")]
    Underflow { id: String, field: &'static str },
    #[error("withdrawal of {change} exceeds value {value} on {id}")]
    WithdrawalExceedsValue { id: String, change: U256, value: U256 },
}

#[derive(Debug, Error)]
pub enum WeightsError {
    #[error("Failed to read weights file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse weights file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid weight for {pool}: {reason}")]
    InvalidWeight { pool: String, reason: String },
}

#[derive(Debug, Deserialize)]
struct WeightsFile {
    positions: HashMap<String, WeightEntry>,
}

#[derive(Debug, Deserialize)]
struct WeightEntry {
    weight: Decimal,
}

/// Per-pool points weights, scaled by 1e18.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PointsWeights {
    by_pool: HashMap<Address, U256>,
}

impl PointsWeights {
    /// Parse `{"positions": {"0xpool": {"weight": 1.5}}}`.
    pub fn from_json(raw: &str) -> Result<Self, WeightsError> {
        let file: WeightsFile = serde_json::from_str(raw)?;
        let mut by_pool = HashMap::with_capacity(file.positions.len());

        for (key, entry) in file.positions {
            let invalid = |reason: &str| WeightsError::InvalidWeight {
                pool: key.clone(),
                reason: reason.to_string(),
            };
            let pool = Address::parse(&key).map_err(|e| invalid(&e.to_string()))?;
            if entry.weight.is_sign_negative() {
                return Err(invalid("weight must not be negative"));
            }
            let scaled = entry
                .weight
                .checked_mul(Decimal::from(DECIMAL_PRECISION))
                .ok_or_else(|| invalid("weight too large"))?
                .trunc()
                .to_u128()
                .ok_or_else(|| invalid("weight too large"))?;
            by_pool.insert(pool, U256::from(scaled));
        }

        Ok(PointsWeights { by_pool })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, WeightsError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn with_weight(mut self, pool: Address, weight: U256) -> Self {
        self.by_pool.insert(pool, weight);
        self
    }

    pub fn weight_for(&self, pool: &Address) -> Option<U256> {
        self.by_pool.get(pool).copied()
    }

    pub fn len(&self) -> usize {
        self.by_pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_pool.is_empty()
    }
}

fn elapsed(position: &StabilityPoolPosition, at: u64) -> Result<u64, PointsError> {
    at.checked_sub(position.last_update_time)
        .ok_or_else(|| PointsError::TimeWentBackwards {
            id: position.id.clone(),
            last: position.last_update_time,
            at,
        })
}

fn checked_add(id: &str, field: &'static str, a: U256, b: U256) -> Result<U256, PointsError> {
    a.checked_add(b).ok_or_else(|| PointsError::Overflow {
        id: id.to_string(),
        field,
    })
}

fn checked_mul(id: &str, field: &'static str, a: U256, b: U256) -> Result<U256, PointsError> {
    a.checked_mul(b).ok_or_else(|| PointsError::Overflow {
        id: id.to_string(),
        field,
    })
}

/// Settle `earning_rate × (at − last_update_time)` points. Does not stamp.
fn accrue(position: &mut StabilityPoolPosition, at: u64) -> Result<(), PointsError> {
    let dt = elapsed(position, at)?;
    let earned = checked_mul(&position.id, "pointsEarned", position.earning_rate, U256::from(dt))?;
    position.points_earned = checked_add(&position.id, "pointsEarned", position.points_earned, earned)?;
    Ok(())
}

fn stash_coll(position: &mut StabilityPoolPosition, event: &DepositOperationEvent) -> Result<(), PointsError> {
    let gained = checked_add(
        &position.id,
        "stashedColl",
        position.stashed_coll,
        event.col_gain_since_last_operation,
    )?;
    position.stashed_coll = gained
        .checked_sub(event.col_gain_claimed)
        .ok_or_else(|| PointsError::Underflow {
            id: position.id.clone(),
            field: "stashedColl",
        })?;
    Ok(())
}

/// New position from a first deposit.
pub fn open_position(user: Address, pool: Address, event: &DepositOperationEvent, at: u64) -> StabilityPoolPosition {
    StabilityPoolPosition::new(user, pool, event.top_up_or_withdrawal.abs, at)
}

/// `value += topUp + (yieldGain − yieldClaimed) − depositLoss`
pub fn apply_provide(
    position: &mut StabilityPoolPosition,
    event: &DepositOperationEvent,
    at: u64,
) -> Result<(), PointsError> {
    accrue(position, at)?;
    stash_coll(position, event)?;

    let id = position.id.as_str();
    let credit = checked_add(id, "value", position.value, event.top_up_or_withdrawal.abs)?;
    let credit = checked_add(id, "value", credit, event.yield_gain_since_last_operation)?;
    let debit = checked_add(id, "value", event.yield_gain_claimed, event.deposit_loss_since_last_operation)?;

    position.value = credit.checked_sub(debit).ok_or_else(|| PointsError::Underflow {
        id: id.to_string(),
        field: "value",
    })?;
    position.last_update_time = at;
    Ok(())
}

/// `value −= withdrawal + depositLoss − (yieldGain − yieldClaimed)`
pub fn apply_withdraw(
    position: &mut StabilityPoolPosition,
    event: &DepositOperationEvent,
    at: u64,
) -> Result<(), PointsError> {
    accrue(position, at)?;
    stash_coll(position, event)?;

    let id = position.id.as_str();
    let credit = checked_add(id, "value", position.value, event.yield_gain_since_last_operation)?;
    let debit = checked_add(id, "value", event.top_up_or_withdrawal.abs, event.deposit_loss_since_last_operation)?;
    let debit = checked_add(id, "value", debit, event.yield_gain_claimed)?;

    position.value = credit.checked_sub(debit).ok_or_else(|| {
        // Report the net change the event asked for.
        let change = debit.saturating_sub(event.yield_gain_since_last_operation);
        PointsError::WithdrawalExceedsValue {
            id: id.to_string(),
            change,
            value: position.value,
        }
    })?;
    position.last_update_time = at;
    Ok(())
}

pub fn apply_claim_all(position: &mut StabilityPoolPosition, at: u64) -> Result<(), PointsError> {
    accrue(position, at)?;
    position.value = U256::zero();
    position.stashed_coll = U256::zero();
    position.last_update_time = at;
    Ok(())
}

/// Re-rate a position with `weight` and settle it up to `at`.
pub fn refresh_position(
    position: &mut StabilityPoolPosition,
    weight: U256,
    at: u64,
) -> Result<(), PointsError> {
    let scaled = checked_mul(&position.id, "earningRate", position.value, weight)?;
    position.earning_rate = scaled / U256::from(DECIMAL_PRECISION);
    accrue(position, at)?;
    position.last_update_time = at;
    Ok(())
}

/// Rebuild the user's totals from their (already refreshed) positions.
pub fn summarize_user(
    user: &mut PointsUser,
    positions: &[StabilityPoolPosition],
    at: u64,
) -> Result<(), PointsError> {
    let id = user.id.to_string();
    let mut points = U256::zero();
    let mut value = U256::zero();
    let mut rate = U256::zero();

    for position in positions {
        points = checked_add(&id, "totalPoints", points, position.points_earned)?;
        value = checked_add(&id, "totalValue", value, position.value)?;
        rate = checked_add(&id, "totalRate", rate, position.earning_rate)?;
    }

    user.total_points = points;
    user.total_value = value;
    user.total_rate = rate;
    user.last_update_time = at;
    Ok(())
}
