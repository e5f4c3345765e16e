//! Repository layer for entity persistence.
//!
//! `Repository` serves reads off the pool (API, tests). `Store` wraps one
//! transaction and is what event handlers load from and save to; nothing a
//! handler writes is visible until `Store::commit`.
//!
//! Methods are organized across submodules by entity:
//! - `collaterals.rs` - Collateral, CollateralAddresses and contract sources
//! - `troves.rs` - Troves
//! - `brackets.rs` - Interest-rate brackets and interest batches
//! - `borrowers.rs` - Borrower trove counters
//! - `points.rs` - Stability-pool positions and points users

mod borrowers;
mod brackets;
mod collaterals;
mod points;
mod troves;

use crate::domain::{parse_u256, Address, U256};
use sqlx::sqlite::{Sqlite, SqlitePool, SqliteRow};
use sqlx::{Row, Transaction};

/// Read access to persisted entities of one indexer scope.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
    indexer: String,
}

impl Repository {
    /// Create a new repository scoped to `indexer`.
    pub fn new(pool: SqlitePool, indexer: impl Into<String>) -> Self {
        Repository {
            pool,
            indexer: indexer.into(),
        }
    }

    pub fn indexer(&self) -> &str {
        &self.indexer
    }

    /// Open a write transaction for one event.
    pub async fn begin(&self) -> Result<Store, sqlx::Error> {
        Ok(Store {
            tx: self.pool.begin().await?,
            indexer: self.indexer.clone(),
        })
    }

    /// Cheap round trip used by readiness checks.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Transactional load/save access used by event handlers.
///
/// Dropping a `Store` without committing rolls the transaction back.
pub struct Store {
    tx: Transaction<'static, Sqlite>,
    indexer: String,
}

impl Store {
    pub fn indexer(&self) -> &str {
        &self.indexer
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }

    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        self.tx.rollback().await
    }
}

// =========================================================================
// Column codecs
// =========================================================================

pub(crate) fn u256_col(row: &SqliteRow, column: &str) -> Result<U256, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    parse_u256(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn address_col(row: &SqliteRow, column: &str) -> Result<Address, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    Address::parse(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn opt_address_col(
    row: &SqliteRow,
    column: &str,
) -> Result<Option<Address>, sqlx::Error> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|r| {
        Address::parse(&r).map_err(|e| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
    })
    .transpose()
}

pub(crate) fn u64_col(row: &SqliteRow, column: &str) -> Result<u64, sqlx::Error> {
    let raw: i64 = row.try_get(column)?;
    u64::try_from(raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn opt_u64_col(row: &SqliteRow, column: &str) -> Result<Option<u64>, sqlx::Error> {
    let raw: Option<i64> = row.try_get(column)?;
    raw.map(|v| {
        u64::try_from(v).map_err(|e| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
    })
    .transpose()
}

pub(crate) fn json_col<T: serde::de::DeserializeOwned>(
    row: &SqliteRow,
    column: &str,
) -> Result<T, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

/// SQLite integers are signed; timestamps and block numbers always fit.
pub(crate) fn to_i64(value: u64) -> Result<i64, sqlx::Error> {
    i64::try_from(value)
        .map_err(|_| sqlx::Error::Protocol(format!("{} does not fit an INTEGER column", value)))
}

pub(crate) fn opt_to_i64(value: Option<u64>) -> Result<Option<i64>, sqlx::Error> {
    value.map(to_i64).transpose()
}

pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> Result<String, sqlx::Error> {
    serde_json::to_string(value)
        .map_err(|e| sqlx::Error::Protocol(format!("failed to encode JSON column: {}", e)))
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_to_i64_rejects_values_above_i64_max() {
        assert_eq!(to_i64(1_700_000_000).unwrap(), 1_700_000_000);
        assert!(matches!(to_i64(u64::MAX), Err(sqlx::Error::Protocol(_))));
        assert_eq!(opt_to_i64(None).unwrap(), None);
        assert_eq!(opt_to_i64(Some(7)).unwrap(), Some(7));
    }

    #[test]
    fn test_to_json_encodes_maps() {
        let mut counts = BTreeMap::new();
        counts.insert(0u32, 2u32);
        assert_eq!(to_json(&counts).unwrap(), r#"{"0":2}"#);
    }
}
