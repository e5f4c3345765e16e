//! Borrower trove counters.

use super::{address_col, json_col, to_json, Repository, Store};
use crate::domain::{Address, BorrowerInfo};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Executor, Row};

fn borrower_from_row(row: &SqliteRow) -> Result<BorrowerInfo, sqlx::Error> {
    Ok(BorrowerInfo {
        id: address_col(row, "id")?,
        troves: row.try_get("troves")?,
        troves_by_collateral: json_col(row, "troves_by_collateral")?,
        next_owner_index_by_collateral: json_col(row, "next_owner_index_by_collateral")?,
    })
}

async fn fetch_borrower<'e, E>(
    executor: E,
    indexer: &str,
    id: &Address,
) -> Result<Option<BorrowerInfo>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        r#"
        SELECT id, troves, troves_by_collateral, next_owner_index_by_collateral
        FROM borrower_infos
        WHERE indexer = ? AND id = ?
        "#,
    )
    .bind(indexer)
    .bind(id.as_str())
    .fetch_optional(executor)
    .await?;
    row.as_ref().map(borrower_from_row).transpose()
}

impl Store {
    pub async fn load_borrower(&mut self, id: &Address) -> Result<Option<BorrowerInfo>, sqlx::Error> {
        fetch_borrower(&mut *self.tx, &self.indexer, id).await
    }

    pub async fn save_borrower(&mut self, info: &BorrowerInfo) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO borrower_infos (
                indexer, id, troves, troves_by_collateral, next_owner_index_by_collateral
            )
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(indexer, id) DO UPDATE SET
                troves = excluded.troves,
                troves_by_collateral = excluded.troves_by_collateral,
                next_owner_index_by_collateral = excluded.next_owner_index_by_collateral
            "#,
        )
        .bind(&self.indexer)
        .bind(info.id.as_str())
        .bind(info.troves)
        .bind(to_json(&info.troves_by_collateral)?)
        .bind(to_json(&info.next_owner_index_by_collateral)?)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }
}

impl Repository {
    pub async fn get_borrower(&self, id: &Address) -> Result<Option<BorrowerInfo>, sqlx::Error> {
        fetch_borrower(&self.pool, &self.indexer, id).await
    }
}
