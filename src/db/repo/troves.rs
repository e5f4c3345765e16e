//! Trove persistence.

use super::{
    address_col, opt_address_col, opt_to_i64, opt_u64_col, to_i64, u256_col, u64_col, Repository,
    Store,
};
use crate::domain::{Address, Trove, TroveStatus};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Executor, Row};

const SELECT_TROVE: &str = r#"
    SELECT id, trove_id, collateral_id, borrower, previous_owner, debt, deposit, stake,
           interest_rate, interest_batch, status, created_at, updated_at, closed_at,
           last_user_action_at, redemption_count, redeemed_coll, redeemed_debt,
           might_be_leveraged, leverage_tx_hash
    FROM troves
"#;

fn trove_from_row(row: &SqliteRow) -> Result<Trove, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let status = status
        .parse::<TroveStatus>()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: e.into(),
        })?;

    Ok(Trove {
        id: row.try_get("id")?,
        trove_id: address_col(row, "trove_id")?,
        collateral_id: row.try_get("collateral_id")?,
        borrower: address_col(row, "borrower")?,
        previous_owner: opt_address_col(row, "previous_owner")?,
        debt: u256_col(row, "debt")?,
        deposit: u256_col(row, "deposit")?,
        stake: u256_col(row, "stake")?,
        interest_rate: u256_col(row, "interest_rate")?,
        interest_batch: row.try_get("interest_batch")?,
        status,
        created_at: u64_col(row, "created_at")?,
        updated_at: u64_col(row, "updated_at")?,
        closed_at: opt_u64_col(row, "closed_at")?,
        last_user_action_at: u64_col(row, "last_user_action_at")?,
        redemption_count: row.try_get("redemption_count")?,
        redeemed_coll: u256_col(row, "redeemed_coll")?,
        redeemed_debt: u256_col(row, "redeemed_debt")?,
        might_be_leveraged: row.try_get::<i32, _>("might_be_leveraged")? != 0,
        leverage_tx_hash: row.try_get("leverage_tx_hash")?,
    })
}

async fn fetch_trove<'e, E>(executor: E, indexer: &str, id: &str) -> Result<Option<Trove>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{} WHERE indexer = ? AND id = ?", SELECT_TROVE);
    let row = sqlx::query(&sql)
        .bind(indexer)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(trove_from_row).transpose()
}

impl Store {
    pub async fn load_trove(&mut self, id: &str) -> Result<Option<Trove>, sqlx::Error> {
        fetch_trove(&mut *self.tx, &self.indexer, id).await
    }

    pub async fn save_trove(&mut self, trove: &Trove) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO troves (
                indexer, id, trove_id, collateral_id, borrower, previous_owner, debt, deposit,
                stake, interest_rate, interest_batch, status, created_at, updated_at, closed_at,
                last_user_action_at, redemption_count, redeemed_coll, redeemed_debt,
                might_be_leveraged, leverage_tx_hash
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(indexer, id) DO UPDATE SET
                borrower = excluded.borrower,
                previous_owner = excluded.previous_owner,
                debt = excluded.debt,
                deposit = excluded.deposit,
                stake = excluded.stake,
                interest_rate = excluded.interest_rate,
                interest_batch = excluded.interest_batch,
                status = excluded.status,
                updated_at = excluded.updated_at,
                closed_at = excluded.closed_at,
                last_user_action_at = excluded.last_user_action_at,
                redemption_count = excluded.redemption_count,
                redeemed_coll = excluded.redeemed_coll,
                redeemed_debt = excluded.redeemed_debt,
                might_be_leveraged = excluded.might_be_leveraged,
                leverage_tx_hash = excluded.leverage_tx_hash
            "#,
        )
        .bind(&self.indexer)
        .bind(&trove.id)
        .bind(trove.trove_id.as_str())
        .bind(&trove.collateral_id)
        .bind(trove.borrower.as_str())
        .bind(trove.previous_owner.as_ref().map(Address::as_str))
        .bind(trove.debt.to_string())
        .bind(trove.deposit.to_string())
        .bind(trove.stake.to_string())
        .bind(trove.interest_rate.to_string())
        .bind(trove.interest_batch.as_deref())
        .bind(trove.status.as_str())
        .bind(to_i64(trove.created_at)?)
        .bind(to_i64(trove.updated_at)?)
        .bind(opt_to_i64(trove.closed_at)?)
        .bind(to_i64(trove.last_user_action_at)?)
        .bind(trove.redemption_count)
        .bind(trove.redeemed_coll.to_string())
        .bind(trove.redeemed_debt.to_string())
        .bind(trove.might_be_leveraged as i32)
        .bind(trove.leverage_tx_hash.as_deref())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }
}

impl Repository {
    pub async fn get_trove(&self, id: &str) -> Result<Option<Trove>, sqlx::Error> {
        fetch_trove(&self.pool, &self.indexer, id).await
    }

    /// Troves of a branch ordered by id.
    pub async fn list_troves_by_collateral(
        &self,
        collateral_id: &str,
    ) -> Result<Vec<Trove>, sqlx::Error> {
        let sql = format!(
            "{} WHERE indexer = ? AND collateral_id = ? ORDER BY id ASC",
            SELECT_TROVE
        );
        let rows = sqlx::query(&sql)
            .bind(&self.indexer)
            .bind(collateral_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(trove_from_row).collect()
    }

    /// Troves currently owned by `borrower`, newest first.
    pub async fn list_troves_by_borrower(
        &self,
        borrower: &Address,
    ) -> Result<Vec<Trove>, sqlx::Error> {
        let sql = format!(
            "{} WHERE indexer = ? AND borrower = ? ORDER BY created_at DESC, id ASC",
            SELECT_TROVE
        );
        let rows = sqlx::query(&sql)
            .bind(&self.indexer)
            .bind(borrower.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(trove_from_row).collect()
    }
}
