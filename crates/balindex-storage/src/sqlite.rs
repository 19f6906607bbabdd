//! SQLite storage backend for balindex.
//!
//! Persists address balances and the progress cursor to a single SQLite
//! file. Uses `sqlx` with WAL mode so the query API can read while the index
//! loop writes.
//!
//! Balances are stored as exact decimal text. Because text does not sort
//! numerically, each row also carries a `sort_key` (see
//! [`balance_sort_key`]) that the pagination query orders by.
//!
//! # Usage
//! ```rust,no_run
//! use balindex_storage::sqlite::SqliteStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // File-backed (persistent)
//! let store = SqliteStorage::open("./data/index.db").await?;
//!
//! // In-memory (tests / ephemeral)
//! let store = SqliteStorage::in_memory().await?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use num_bigint::BigInt;
use num_traits::Zero;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Executor, Row, Sqlite, SqlitePool};
use tracing::debug;

use balindex_core::delta::AddressDelta;
use balindex_core::error::IndexerError;
use balindex_core::store::{balance_sort_key, page_offset, parse_balance, BalanceStore};
use balindex_core::types::BalanceRecord;

fn storage_err(e: sqlx::Error) -> IndexerError {
    IndexerError::Storage(e.to_string())
}

/// SQLite-backed balance store.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./data/index.db"`) or a full
    /// SQLite URL (`"sqlite:./index.db?mode=rwc"`). Missing parent
    /// directories of a plain path are created.
    pub async fn open(path: &str) -> Result<Self, IndexerError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        IndexerError::Storage(format!("create {}: {e}", parent.display()))
                    })?;
                }
            }
            format!("sqlite:{path}?mode=rwc")
        };

        let options = SqliteConnectOptions::from_str(&url)
            .map_err(storage_err)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(storage_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Open an in-memory SQLite database.
    ///
    /// Limited to one connection, since every connection to `:memory:` sees
    /// its own database. All data is lost when the pool is dropped.
    pub async fn in_memory() -> Result<Self, IndexerError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(storage_err)?;

        let storage = Self { pool };
        storage.init_schema().await?;
        Ok(storage)
    }

    /// Create tables and seed the progress row.
    async fn init_schema(&self) -> Result<(), IndexerError> {
        // Single-row progress table
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS progress (
                id          INTEGER PRIMARY KEY CHECK (id = 1),
                last_height INTEGER NOT NULL,
                updated_at  INTEGER NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query("INSERT OR IGNORE INTO progress (id, last_height, updated_at) VALUES (1, 0, 0);")
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        // Balances, exact decimal text plus an order-preserving key
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS balances (
                address  TEXT PRIMARY KEY,
                balance  TEXT NOT NULL,
                sort_key TEXT NOT NULL
            );",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_balances_sort ON balances (sort_key DESC, address);",
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        debug!("schema ready");
        Ok(())
    }

    /// When the cursor last moved, `None` if no batch has been applied yet.
    pub async fn updated_at(&self) -> Result<Option<DateTime<Utc>>, IndexerError> {
        let row = sqlx::query("SELECT updated_at FROM progress WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(row
            .map(|r| r.get::<i64, _>("updated_at"))
            .filter(|ts| *ts > 0)
            .and_then(|ts| DateTime::from_timestamp(ts, 0)))
    }
}

async fn fetch_page<'e, E>(
    executor: E,
    page: u64,
    page_size: u64,
) -> Result<Vec<BalanceRecord>, IndexerError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query(
        "SELECT address, balance FROM balances
         ORDER BY sort_key DESC, address ASC
         LIMIT ? OFFSET ?",
    )
    .bind(page_size as i64)
    .bind(page_offset(page, page_size) as i64)
    .fetch_all(executor)
    .await
    .map_err(storage_err)?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let balance: String = row.get("balance");
        records.push(BalanceRecord {
            address: row.get("address"),
            balance: parse_balance(&balance)?,
        });
    }
    Ok(records)
}

async fn fetch_count<'e, E>(executor: E) -> Result<u64, IndexerError>
where
    E: Executor<'e, Database = Sqlite>,
{
    let cnt: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM balances")
        .fetch_one(executor)
        .await
        .map_err(storage_err)?;
    Ok(cnt as u64)
}

// ─── BalanceStore impl ───────────────────────────────────────────────────────

#[async_trait]
impl BalanceStore for SqliteStorage {
    async fn last_height(&self) -> Result<u64, IndexerError> {
        let row = sqlx::query("SELECT last_height FROM progress WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(row.map(|r| r.get::<i64, _>("last_height") as u64).unwrap_or(0))
    }

    async fn set_last_height(&self, height: u64) -> Result<(), IndexerError> {
        sqlx::query("UPDATE progress SET last_height = ?, updated_at = ? WHERE id = 1")
            .bind(height as i64)
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        Ok(())
    }

    async fn apply_deltas(
        &self,
        deltas: &[AddressDelta],
        new_height: u64,
    ) -> Result<(), IndexerError> {
        // Dropping `tx` on any early return rolls the whole batch back.
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        for AddressDelta { address, delta } in deltas {
            if delta.is_zero() {
                continue;
            }

            let current: Option<String> =
                sqlx::query_scalar("SELECT balance FROM balances WHERE address = ?")
                    .bind(address)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(storage_err)?;

            let next = match current {
                Some(text) => parse_balance(&text)? + delta,
                None => delta.clone(),
            };

            if next.is_zero() {
                sqlx::query("DELETE FROM balances WHERE address = ?")
                    .bind(address)
                    .execute(&mut *tx)
                    .await
                    .map_err(storage_err)?;
            } else {
                sqlx::query(
                    "INSERT INTO balances (address, balance, sort_key) VALUES (?, ?, ?)
                     ON CONFLICT(address) DO UPDATE
                     SET balance = excluded.balance, sort_key = excluded.sort_key",
                )
                .bind(address)
                .bind(next.to_string())
                .bind(balance_sort_key(&next))
                .execute(&mut *tx)
                .await
                .map_err(storage_err)?;
            }
        }

        sqlx::query("UPDATE progress SET last_height = ?, updated_at = ? WHERE id = 1")
            .bind(new_height as i64)
            .bind(Utc::now().timestamp())
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;

        tx.commit().await.map_err(storage_err)?;

        debug!(deltas = deltas.len(), height = new_height, "deltas applied");
        Ok(())
    }

    async fn list_by_balance_desc(
        &self,
        page: u64,
        page_size: u64,
    ) -> Result<Vec<BalanceRecord>, IndexerError> {
        fetch_page(&self.pool, page, page_size).await
    }

    async fn count(&self) -> Result<u64, IndexerError> {
        fetch_count(&self.pool).await
    }

    async fn balance_page(
        &self,
        page: u64,
        page_size: u64,
    ) -> Result<(Vec<BalanceRecord>, u64), IndexerError> {
        // One read transaction: both queries see the same WAL snapshot.
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        let records = fetch_page(&mut *tx, page, page_size).await?;
        let total = fetch_count(&mut *tx).await?;
        tx.commit().await.map_err(storage_err)?;
        Ok((records, total))
    }

    async fn balance_of(&self, address: &str) -> Result<Option<BigInt>, IndexerError> {
        let balance: Option<String> =
            sqlx::query_scalar("SELECT balance FROM balances WHERE address = ?")
                .bind(address)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage_err)?;

        balance.as_deref().map(parse_balance).transpose()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
