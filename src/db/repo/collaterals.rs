//! Collateral branches, their contract addresses and registered sources.

use super::{address_col, to_i64, u256_col, u64_col, Repository, Store};
use crate::domain::{Address, Collateral, CollateralAddresses, ContractSource, SourceTemplate};
use sqlx::sqlite::{Sqlite, SqliteRow};
use sqlx::{Executor, Row};

const SELECT_COLLATERAL: &str = r#"
    SELECT id, coll_index, min_coll_ratio, created_at_block
    FROM collaterals
"#;

const SELECT_ADDRESSES: &str = r#"
    SELECT id, collateral_id, token, borrower_operations, sorted_troves, stability_pool,
           trove_manager, trove_nft, trove_manager_events_emitter, liquidation_manager,
           redemption_manager, batch_manager
    FROM collateral_addresses
"#;

fn collateral_from_row(row: &SqliteRow) -> Result<Collateral, sqlx::Error> {
    Ok(Collateral {
        id: row.try_get("id")?,
        coll_index: row.try_get("coll_index")?,
        min_coll_ratio: u256_col(row, "min_coll_ratio")?,
        created_at_block: u64_col(row, "created_at_block")?,
    })
}

fn addresses_from_row(row: &SqliteRow) -> Result<CollateralAddresses, sqlx::Error> {
    Ok(CollateralAddresses {
        id: row.try_get("id")?,
        collateral_id: row.try_get("collateral_id")?,
        token: address_col(row, "token")?,
        borrower_operations: address_col(row, "borrower_operations")?,
        sorted_troves: address_col(row, "sorted_troves")?,
        stability_pool: address_col(row, "stability_pool")?,
        trove_manager: address_col(row, "trove_manager")?,
        trove_nft: address_col(row, "trove_nft")?,
        trove_manager_events_emitter: address_col(row, "trove_manager_events_emitter")?,
        liquidation_manager: address_col(row, "liquidation_manager")?,
        redemption_manager: address_col(row, "redemption_manager")?,
        batch_manager: address_col(row, "batch_manager")?,
    })
}

fn source_from_row(row: &SqliteRow) -> Result<ContractSource, sqlx::Error> {
    let template: String = row.try_get("template")?;
    let template = template
        .parse::<SourceTemplate>()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "template".to_string(),
            source: e.into(),
        })?;
    Ok(ContractSource {
        address: address_col(row, "address")?,
        template,
        collateral_id: row.try_get("collateral_id")?,
        start_block: u64_col(row, "start_block")?,
    })
}

async fn fetch_collateral<'e, E>(
    executor: E,
    indexer: &str,
    id: &str,
) -> Result<Option<Collateral>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{} WHERE indexer = ? AND id = ?", SELECT_COLLATERAL);
    let row = sqlx::query(&sql)
        .bind(indexer)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(collateral_from_row).transpose()
}

async fn fetch_addresses<'e, E>(
    executor: E,
    indexer: &str,
    id: &str,
) -> Result<Option<CollateralAddresses>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{} WHERE indexer = ? AND id = ?", SELECT_ADDRESSES);
    let row = sqlx::query(&sql)
        .bind(indexer)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(addresses_from_row).transpose()
}

impl Store {
    pub async fn load_collateral(&mut self, id: &str) -> Result<Option<Collateral>, sqlx::Error> {
        fetch_collateral(&mut *self.tx, &self.indexer, id).await
    }

    pub async fn load_collateral_addresses(
        &mut self,
        id: &str,
    ) -> Result<Option<CollateralAddresses>, sqlx::Error> {
        fetch_addresses(&mut *self.tx, &self.indexer, id).await
    }

    pub async fn save_collateral(&mut self, collateral: &Collateral) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO collaterals (indexer, id, coll_index, min_coll_ratio, created_at_block)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(indexer, id) DO UPDATE SET
                coll_index = excluded.coll_index,
                min_coll_ratio = excluded.min_coll_ratio,
                created_at_block = excluded.created_at_block
            "#,
        )
        .bind(&self.indexer)
        .bind(&collateral.id)
        .bind(collateral.coll_index)
        .bind(collateral.min_coll_ratio.to_string())
        .bind(to_i64(collateral.created_at_block)?)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    pub async fn save_collateral_addresses(
        &mut self,
        addresses: &CollateralAddresses,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO collateral_addresses (
                indexer, id, collateral_id, token, borrower_operations, sorted_troves,
                stability_pool, trove_manager, trove_nft, trove_manager_events_emitter,
                liquidation_manager, redemption_manager, batch_manager
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(indexer, id) DO UPDATE SET
                collateral_id = excluded.collateral_id,
                token = excluded.token,
                borrower_operations = excluded.borrower_operations,
                sorted_troves = excluded.sorted_troves,
                stability_pool = excluded.stability_pool,
                trove_manager = excluded.trove_manager,
                trove_nft = excluded.trove_nft,
                trove_manager_events_emitter = excluded.trove_manager_events_emitter,
                liquidation_manager = excluded.liquidation_manager,
                redemption_manager = excluded.redemption_manager,
                batch_manager = excluded.batch_manager
            "#,
        )
        .bind(&self.indexer)
        .bind(&addresses.id)
        .bind(&addresses.collateral_id)
        .bind(addresses.token.as_str())
        .bind(addresses.borrower_operations.as_str())
        .bind(addresses.sorted_troves.as_str())
        .bind(addresses.stability_pool.as_str())
        .bind(addresses.trove_manager.as_str())
        .bind(addresses.trove_nft.as_str())
        .bind(addresses.trove_manager_events_emitter.as_str())
        .bind(addresses.liquidation_manager.as_str())
        .bind(addresses.redemption_manager.as_str())
        .bind(addresses.batch_manager.as_str())
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    /// Register `address` under `template` from `start_block` on.
    ///
    /// Returns false when the registration already existed.
    pub async fn register_source(
        &mut self,
        template: SourceTemplate,
        address: &Address,
        collateral_id: Option<&str>,
        start_block: u64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO contract_sources (indexer, address, template, collateral_id, start_block)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(indexer, address, template) DO NOTHING
            "#,
        )
        .bind(&self.indexer)
        .bind(address.as_str())
        .bind(template.as_str())
        .bind(collateral_id)
        .bind(to_i64(start_block)?)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sources registered for a contract, across templates.
    pub async fn load_sources(
        &mut self,
        address: &Address,
    ) -> Result<Vec<ContractSource>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT address, template, collateral_id, start_block
            FROM contract_sources
            WHERE indexer = ? AND address = ?
            ORDER BY template ASC
            "#,
        )
        .bind(&self.indexer)
        .bind(address.as_str())
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(source_from_row).collect()
    }
}

impl Repository {
    pub async fn get_collateral(&self, id: &str) -> Result<Option<Collateral>, sqlx::Error> {
        fetch_collateral(&self.pool, &self.indexer, id).await
    }

    pub async fn get_collateral_addresses(
        &self,
        id: &str,
    ) -> Result<Option<CollateralAddresses>, sqlx::Error> {
        fetch_addresses(&self.pool, &self.indexer, id).await
    }

    pub async fn list_collaterals(&self) -> Result<Vec<Collateral>, sqlx::Error> {
        let sql = format!("{} WHERE indexer = ? ORDER BY coll_index ASC", SELECT_COLLATERAL);
        let rows = sqlx::query(&sql)
            .bind(&self.indexer)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(collateral_from_row).collect()
    }

    pub async fn list_sources(&self) -> Result<Vec<ContractSource>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT address, template, collateral_id, start_block
            FROM contract_sources
            WHERE indexer = ?
            ORDER BY start_block ASC, address ASC, template ASC
            "#,
        )
        .bind(&self.indexer)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(source_from_row).collect()
    }
}
