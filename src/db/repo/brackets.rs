//! Interest-rate bracket and interest batch persistence.

use super::{address_col, to_i64, u256_col, u64_col, Repository, Store};
use crate::domain::{DebtAccumulator, InterestBatch, InterestRateBracket};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Executor, Row};

const SELECT_BRACKET: &str = r#"
    SELECT id, collateral_id, rate, total_debt, sum_debt_times_rate_d36,
           pending_debt_times_one_year_d36, updated_at
    FROM interest_rate_brackets
"#;

const SELECT_BATCH: &str = r#"
    SELECT id, collateral_id, batch_manager, coll, annual_interest_rate, annual_management_fee,
           total_debt, sum_debt_times_rate_d36, pending_debt_times_one_year_d36, updated_at
    FROM interest_batches
"#;

fn accumulator_from_row(row: &SqliteRow) -> Result<DebtAccumulator, sqlx::Error> {
    Ok(DebtAccumulator {
        total_debt: u256_col(row, "total_debt")?,
        sum_debt_times_rate_d36: u256_col(row, "sum_debt_times_rate_d36")?,
        pending_debt_times_one_year_d36: u256_col(row, "pending_debt_times_one_year_d36")?,
        updated_at: u64_col(row, "updated_at")?,
    })
}

fn bracket_from_row(row: &SqliteRow) -> Result<InterestRateBracket, sqlx::Error> {
    Ok(InterestRateBracket {
        id: row.try_get("id")?,
        collateral_id: row.try_get("collateral_id")?,
        rate: u256_col(row, "rate")?,
        accrual: accumulator_from_row(row)?,
    })
}

fn batch_from_row(row: &SqliteRow) -> Result<InterestBatch, sqlx::Error> {
    Ok(InterestBatch {
        id: row.try_get("id")?,
        collateral_id: row.try_get("collateral_id")?,
        batch_manager: address_col(row, "batch_manager")?,
        coll: u256_col(row, "coll")?,
        annual_interest_rate: u256_col(row, "annual_interest_rate")?,
        annual_management_fee: u256_col(row, "annual_management_fee")?,
        accrual: accumulator_from_row(row)?,
    })
}

async fn fetch_bracket<'e, E>(
    executor: E,
    indexer: &str,
    id: &str,
) -> Result<Option<InterestRateBracket>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{} WHERE indexer = ? AND id = ?", SELECT_BRACKET);
    let row = sqlx::query(&sql)
        .bind(indexer)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(bracket_from_row).transpose()
}

async fn fetch_batch<'e, E>(
    executor: E,
    indexer: &str,
    id: &str,
) -> Result<Option<InterestBatch>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{} WHERE indexer = ? AND id = ?", SELECT_BATCH);
    let row = sqlx::query(&sql)
        .bind(indexer)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(batch_from_row).transpose()
}

impl Store {
    pub async fn load_bracket(
        &mut self,
        id: &str,
    ) -> Result<Option<InterestRateBracket>, sqlx::Error> {
        fetch_bracket(&mut *self.tx, &self.indexer, id).await
    }

    pub async fn save_bracket(&mut self, bracket: &InterestRateBracket) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO interest_rate_brackets (
                indexer, id, collateral_id, rate, total_debt, sum_debt_times_rate_d36,
                pending_debt_times_one_year_d36, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(indexer, id) DO UPDATE SET
                total_debt = excluded.total_debt,
                sum_debt_times_rate_d36 = excluded.sum_debt_times_rate_d36,
                pending_debt_times_one_year_d36 = excluded.pending_debt_times_one_year_d36,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.indexer)
        .bind(&bracket.id)
        .bind(&bracket.collateral_id)
        .bind(bracket.rate.to_string())
        .bind(bracket.accrual.total_debt.to_string())
        .bind(bracket.accrual.sum_debt_times_rate_d36.to_string())
        .bind(bracket.accrual.pending_debt_times_one_year_d36.to_string())
        .bind(to_i64(bracket.accrual.updated_at)?)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    pub async fn load_batch(&mut self, id: &str) -> Result<Option<InterestBatch>, sqlx::Error> {
        fetch_batch(&mut *self.tx, &self.indexer, id).await
    }

    pub async fn save_batch(&mut self, batch: &InterestBatch) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO interest_batches (
                indexer, id, collateral_id, batch_manager, coll, annual_interest_rate,
                annual_management_fee, total_debt, sum_debt_times_rate_d36,
                pending_debt_times_one_year_d36, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(indexer, id) DO UPDATE SET
                coll = excluded.coll,
                annual_interest_rate = excluded.annual_interest_rate,
                annual_management_fee = excluded.annual_management_fee,
                total_debt = excluded.total_debt,
                sum_debt_times_rate_d36 = excluded.sum_debt_times_rate_d36,
                pending_debt_times_one_year_d36 = excluded.pending_debt_times_one_year_d36,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.indexer)
        .bind(&batch.id)
        .bind(&batch.collateral_id)
        .bind(batch.batch_manager.as_str())
        .bind(batch.coll.to_string())
        .bind(batch.annual_interest_rate.to_string())
        .bind(batch.annual_management_fee.to_string())
        .bind(batch.accrual.total_debt.to_string())
        .bind(batch.accrual.sum_debt_times_rate_d36.to_string())
        .bind(batch.accrual.pending_debt_times_one_year_d36.to_string())
        .bind(to_i64(batch.accrual.updated_at)?)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }
}

impl Repository {
    pub async fn get_bracket(&self, id: &str) -> Result<Option<InterestRateBracket>, sqlx::Error> {
        fetch_bracket(&self.pool, &self.indexer, id).await
    }

    /// Brackets of a branch. Rates are decimal TEXT, so order numerically in Rust.
    pub async fn list_brackets(
        &self,
        collateral_id: &str,
    ) -> Result<Vec<InterestRateBracket>, sqlx::Error> {
        let sql = format!("{} WHERE indexer = ? AND collateral_id = ?", SELECT_BRACKET);
        let rows = sqlx::query(&sql)
            .bind(&self.indexer)
            .bind(collateral_id)
            .fetch_all(&self.pool)
            .await?;
        let mut brackets = rows
            .iter()
            .map(bracket_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        brackets.sort_by(|a, b| a.rate.cmp(&b.rate));
        Ok(brackets)
    }

    pub async fn get_batch(&self, id: &str) -> Result<Option<InterestBatch>, sqlx::Error> {
        fetch_batch(&self.pool, &self.indexer, id).await
    }

    pub async fn list_batches(
        &self,
        collateral_id: &str,
    ) -> Result<Vec<InterestBatch>, sqlx::Error> {
        let sql = format!(
            "{} WHERE indexer = ? AND collateral_id = ? ORDER BY id ASC",
            SELECT_BATCH
        );
        let rows = sqlx::query(&sql)
            .bind(&self.indexer)
            .bind(collateral_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(batch_from_row).collect()
    }
}
