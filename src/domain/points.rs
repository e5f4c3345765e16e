//! Stability-pool positions and per-user points totals.

use super::primitives::Address;
use super::uint::{serde_u256, U256};
use serde::{Deserialize, Serialize};

/// `user-poolAddress`.
pub fn sp_position_id(user: &Address, pool: &Address) -> String {
    format!("{}-{}", user, pool)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityPoolPosition {
    pub id: String,
    pub user: Address,
    pub pool: Address,
    #[serde(with = "serde_u256")]
    pub value: U256,
    #[serde(with = "serde_u256")]
    pub points_earned: U256,
    #[serde(with = "serde_u256")]
    pub stashed_coll: U256,
    /// Points per second.
    #[serde(with = "serde_u256")]
    pub earning_rate: U256,
    pub last_update_time: u64,
}

impl StabilityPoolPosition {
    pub fn new(user: Address, pool: Address, value: U256, at: u64) -> Self {
        StabilityPoolPosition {
            id: sp_position_id(&user, &pool),
            user,
            pool,
            value,
            points_earned: U256::zero(),
            stashed_coll: U256::zero(),
            earning_rate: U256::zero(),
            last_update_time: at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointsUser {
    pub id: Address,
    #[serde(with = "serde_u256")]
    pub total_points: U256,
    #[serde(with = "serde_u256")]
    pub total_value: U256,
    #[serde(with = "serde_u256")]
    pub total_rate: U256,
    pub last_update_time: u64,
    pub sp_positions: Vec<String>,
}

impl PointsUser {
    pub fn new(id: Address, at: u64) -> Self {
        PointsUser {
            id,
            total_points: U256::zero(),
            total_value: U256::zero(),
            total_rate: U256::zero(),
            last_update_time: at,
            sp_positions: Vec::new(),
        }
    }

    pub fn track_position(&mut self, position_id: &str) {
        if !self.sp_positions.iter().any(|p| p == position_id) {
            self.sp_positions.push(position_id.to_string());
        }
    }
}
