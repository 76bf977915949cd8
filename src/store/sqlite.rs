//! SQLite-backed storage for exchange rate rows.
use crate::core::{Error, PersistedRate, RateReading, RateRepository};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    Connection, Row, Sqlite, SqlitePool, Transaction,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
};
use std::path::Path;
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{debug, info, instrument, warn};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS exchange_rates (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    bid TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    deleted_at TEXT NULL
)"#;

const CREATE_DELETED_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_exchange_rates_deleted_at ON exchange_rates (deleted_at)";

#[derive(Clone)]
pub struct SqliteRateStore {
    pool: SqlitePool,
}

impl SqliteRateStore {
    /// Opens (creating if missing) the database file at `path`.
    pub async fn connect(path: &Path) -> Result<Self, Error> {
        Self::open(path, base_options(path).create_if_missing(true)).await
    }

    /// Opens an existing database file without write access.
    pub async fn connect_read_only(path: &Path) -> Result<Self, Error> {
        Self::open(path, base_options(path).read_only(true)).await
    }

    async fn open(path: &Path, opts: SqliteConnectOptions) -> Result<Self, Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .map_err(Error::StoreOpen)?;

        info!("Opened database at {}", path.display());
        Ok(Self { pool })
    }

    /// Creates the rates table when absent. Safe to run repeatedly.
    pub async fn migrate(&self) -> Result<(), Error> {
        for ddl in [CREATE_TABLE, CREATE_DELETED_INDEX] {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(Error::StoreOpen)?;
        }
        debug!("exchange_rates schema ready");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Inserts inside a transaction that only commits when the insert
    /// finished before `timeout`; otherwise the row is rolled back.
    async fn insert(
        &self,
        reading: &RateReading,
        timeout: Duration,
    ) -> Result<PersistedRate, Error> {
        let deadline = Instant::now() + timeout;
        let mut conn = time::timeout_at(deadline, self.pool.acquire())
            .await
            .map_err(|_| Error::StoreTimeout(timeout))?
            .map_err(Error::StoreQuery)?;
        let mut tx = conn.begin().await.map_err(Error::StoreQuery)?;

        let now = Utc::now();
        let insert = sqlx::query(
            "INSERT INTO exchange_rates (bid, created_at, updated_at) VALUES (?, ?, ?)",
        )
        .bind(reading.bid())
        .bind(now)
        .bind(now)
        .execute(&mut *tx);
        let outcome = time::timeout_at(deadline, insert).await;

        let result = match outcome {
            Ok(result) => result.map_err(Error::StoreQuery)?,
            Err(_) => {
                rollback(tx).await;
                return Err(Error::StoreTimeout(timeout));
            }
        };

        if Instant::now() >= deadline {
            rollback(tx).await;
            return Err(Error::StoreTimeout(timeout));
        }
        tx.commit().await.map_err(Error::StoreQuery)?;

        Ok(PersistedRate {
            id: result.last_insert_rowid(),
            bid: reading.bid().to_string(),
            created_at: now,
        })
    }
}

fn base_options(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .busy_timeout(Duration::from_secs(5))
}

async fn rollback(tx: Transaction<'_, Sqlite>) {
    if let Err(e) = tx.rollback().await {
        warn!(error = %e, "Failed to roll back timed out insert");
    }
}

fn row_to_rate(row: &SqliteRow) -> Result<PersistedRate, sqlx::Error> {
    Ok(PersistedRate {
        id: row.try_get("id")?,
        bid: row.try_get("bid")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

#[async_trait]
impl RateRepository for SqliteRateStore {
    #[instrument(name = "RatePersist", skip(self, reading), fields(bid = %reading))]
    async fn persist(
        &self,
        reading: &RateReading,
        timeout: Duration,
    ) -> Result<PersistedRate, Error> {
        let persisted = self.insert(reading, timeout).await?;
        debug!(id = persisted.id, "Saved exchange rate");
        Ok(persisted)
    }

    async fn recent(&self, limit: u32) -> Result<Vec<PersistedRate>, Error> {
        let rows = sqlx::query(
            "SELECT id, bid, created_at FROM exchange_rates \
             WHERE deleted_at IS NULL ORDER BY id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::StoreQuery)?;

        rows.iter()
            .map(row_to_rate)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::StoreQuery)
    }
}
