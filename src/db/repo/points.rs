//! Stability-pool positions and points users.

use super::{address_col, json_col, to_i64, to_json, u256_col, u64_col, Repository, Store};
use crate::domain::{Address, PointsUser, StabilityPoolPosition};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Executor, Row};

fn position_from_row(row: &SqliteRow) -> Result<StabilityPoolPosition, sqlx::Error> {
    Ok(StabilityPoolPosition {
        id: row.try_get("id")?,
        user: address_col(row, "user")?,
        pool: address_col(row, "pool")?,
        value: u256_col(row, "value")?,
        points_earned: u256_col(row, "points_earned")?,
        stashed_coll: u256_col(row, "stashed_coll")?,
        earning_rate: u256_col(row, "earning_rate")?,
        last_update_time: u64_col(row, "last_update_time")?,
    })
}

fn user_from_row(row: &SqliteRow) -> Result<PointsUser, sqlx::Error> {
    Ok(PointsUser {
        id: address_col(row, "id")?,
        total_points: u256_col(row, "total_points")?,
        total_value: u256_col(row, "total_value")?,
        total_rate: u256_col(row, "total_rate")?,
        last_update_time: u64_col(row, "last_update_time")?,
        sp_positions: json_col(row, "sp_positions")?,
    })
}

async fn fetch_position<'e, E>(
    executor: E,
    indexer: &str,
    id: &str,
) -> Result<Option<StabilityPoolPosition>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT id, user, pool, value, points_earned, stashed_coll, earning_rate, last_update_time
        FROM sp_positions
        WHERE indexer = ? AND id = ?
        "#,
    )
    .bind(indexer)
    .bind(id)
    .fetch_optional(executor)
    .await?;
    row.as_ref().map(position_from_row).transpose()
}

async fn fetch_user<'e, E>(
    executor: E,
    indexer: &str,
    id: &Address,
) -> Result<Option<PointsUser>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT id, total_points, total_value, total_rate, last_update_time, sp_positions
        FROM points_users
        WHERE indexer = ? AND id = ?
        "#,
    )
    .bind(indexer)
    .bind(id.as_str())
    .fetch_optional(executor)
    .await?;
    row.as_ref().map(user_from_row).transpose()
}

impl Store {
    pub async fn load_sp_position(
        &mut self,
        id: &str,
    ) -> Result<Option<StabilityPoolPosition>, sqlx::Error> {
        fetch_position(&mut *self.tx, &self.indexer, id).await
    }

    pub async fn save_sp_position(
        &mut self,
        position: &StabilityPoolPosition,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO sp_positions (
                indexer, id, user, pool, value, points_earned, stashed_coll, earning_rate,
                last_update_time
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(indexer, id) DO UPDATE SET
                value = excluded.value,
                points_earned = excluded.points_earned,
                stashed_coll = excluded.stashed_coll,
                earning_rate = excluded.earning_rate,
                last_update_time = excluded.last_update_time
            "#,
        )
        .bind(&self.indexer)
        .bind(&position.id)
        .bind(position.user.as_str())
        .bind(position.pool.as_str())
        .bind(position.value.to_string())
        .bind(position.points_earned.to_string())
        .bind(position.stashed_coll.to_string())
        .bind(position.earning_rate.to_string())
        .bind(to_i64(position.last_update_time)?)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    pub async fn load_points_user(&mut self, id: &Address) -> Result<Option<PointsUser>, sqlx::Error> {
        fetch_user(&mut *self.tx, &self.indexer, id).await
    }

    pub async fn save_points_user(&mut self, user: &PointsUser) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO points_users (
                indexer, id, total_points, total_value, total_rate, last_update_time, sp_positions
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(indexer, id) DO UPDATE SET
                total_points = excluded.total_points,
                total_value = excluded.total_value,
                total_rate = excluded.total_rate,
                last_update_time = excluded.last_update_time,
                sp_positions = excluded.sp_positions
            "#,
        )
        .bind(&self.indexer)
        .bind(user.id.as_str())
        .bind(user.total_points.to_string())
        .bind(user.total_value.to_string())
        .bind(user.total_rate.to_string())
        .bind(to_i64(user.last_update_time)?)
        .bind(to_json(&user.sp_positions)?)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }
}

impl Repository {
    pub async fn get_sp_position(
        &self,
        id: &str,
    ) -> Result<Option<StabilityPoolPosition>, sqlx::Error> {
        fetch_position(&self.pool, &self.indexer, id).await
    }

    pub async fn get_points_user(&self, id: &Address) -> Result<Option<PointsUser>, sqlx::Error> {
        fetch_user(&self.pool, &self.indexer, id).await
    }
}
