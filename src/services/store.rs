use sqlx::{sqlite::SqliteConnectOptions, Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::Result;
use crate::models::{CachedStock, StockRecord};

/// `last_updated` value written by [`StockStore::expire_all`]. Old enough to
/// fail any freshness check, so the next read refetches everything.
const EXPIRED_SENTINEL: &str = "2000-01-01 00:00:00";

/// Columns added after the first release, in the order they shipped.
/// Startup replays this list and adds whatever the database is missing.
const MIGRATED_COLUMNS: &[(&str, &str)] = &[
    ("name", "TEXT"),
    ("recommendation", "TEXT"),
    ("market_cap", "REAL"),
    ("beta", "REAL"),
    ("sector", "TEXT"),
    ("operating_margin", "REAL"),
    ("ebitda", "REAL"),
    ("total_debt", "REAL"),
    ("total_cash", "REAL"),
];

/// SQLite-backed fundamentals cache, one row per ticker
pub struct StockStore {
    pool: SqlitePool,
    database_path: PathBuf,
}

impl StockStore {
    /// Open (creating if missing) the cache database and bring its schema
    /// up to date.
    pub async fn new(database_path: PathBuf) -> Result<Self> {
        info!("Initializing stock cache at: {:?}", database_path);

        // Ensure parent directory exists
        if let Some(parent) = database_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let connect_options = SqliteConnectOptions::new()
            .filename(&database_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePool::connect_with(connect_options).await?;

        let store = Self {
            pool,
            database_path,
        };
        store.initialize_schema().await?;

        info!("Stock cache initialized successfully");
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stocks (
                ticker TEXT PRIMARY KEY,
                price REAL,
                pe REAL,
                pbv REAL,
                roe REAL,
                div_yield REAL,
                last_updated TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        self.apply_migrations().await?;
        Ok(())
    }

    /// Additive, idempotent column migrations. Rerunning against an
    /// up-to-date database is a no-op; existing rows keep NULL in new
    /// columns until their next refresh.
    async fn apply_migrations(&self) -> Result<()> {
        let rows = sqlx::query("PRAGMA table_info(stocks)")
            .fetch_all(&self.pool)
            .await?;

        let existing: Vec<String> = rows
            .iter()
            .filter_map(|row| row.try_get::<String, _>("name").ok())
            .collect();

        for (column, column_type) in MIGRATED_COLUMNS {
            if existing.iter().any(|c| c == column) {
                continue;
            }
            info!("Migrating stocks table: adding column {}", column);
            sqlx::query(&format!(
                "ALTER TABLE stocks ADD COLUMN {} {}",
                column, column_type
            ))
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Fetch one cached row
    pub async fn get(&self, ticker: &str) -> Result<Option<CachedStock>> {
        let row = sqlx::query("SELECT * FROM stocks WHERE ticker = ?1")
            .bind(ticker)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_cached).transpose()
    }

    /// All cached rows in ticker order
    pub async fn all(&self) -> Result<Vec<CachedStock>> {
        let rows = sqlx::query("SELECT * FROM stocks ORDER BY ticker")
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_cached).collect()
    }

    /// Insert or replace the row for `record.ticker` (last write wins)
    pub async fn upsert(&self, record: &StockRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO stocks
            (ticker, price, pe, pbv, roe, div_yield, last_updated,
             name, recommendation, market_cap, beta, sector,
             operating_margin, ebitda, total_debt, total_cash)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            "#,
        )
        .bind(&record.ticker)
        .bind(record.price)
        .bind(record.pe)
        .bind(record.pbv)
        .bind(record.roe)
        .bind(record.div_yield)
        .bind(&record.last_updated)
        .bind(&record.name)
        .bind(&record.recommendation)
        .bind(record.market_cap)
        .bind(record.beta)
        .bind(&record.sector)
        .bind(record.operating_margin)
        .bind(record.ebitda)
        .bind(record.total_debt)
        .bind(record.total_cash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Force every row stale. Returns the number of rows touched.
    pub async fn expire_all(&self) -> Result<u64> {
        let result = sqlx::query("UPDATE stocks SET last_updated = ?1")
            .bind(EXPIRED_SENTINEL)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Number of cached rows
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stocks")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Decode a row by column name. v1 columns decode through `Option` as well
/// so a hand-edited NULL degrades to zero instead of failing the scan.
fn row_to_cached(row: &sqlx::sqlite::SqliteRow) -> Result<CachedStock> {
    Ok(CachedStock {
        ticker: row.try_get("ticker")?,
        price: row.try_get::<Option<f64>, _>("price")?.unwrap_or(0.0),
        pe: row.try_get::<Option<f64>, _>("pe")?.unwrap_or(0.0),
        pbv: row.try_get::<Option<f64>, _>("pbv")?.unwrap_or(0.0),
        roe: row.try_get::<Option<f64>, _>("roe")?.unwrap_or(0.0),
        div_yield: row.try_get::<Option<f64>, _>("div_yield")?.unwrap_or(0.0),
        last_updated: row
            .try_get::<Option<String>, _>("last_updated")?
            .unwrap_or_default(),
        name: row.try_get("name")?,
        recommendation: row.try_get("recommendation")?,
        market_cap: row.try_get("market_cap")?,
        beta: row.try_get("beta")?,
        sector: row.try_get("sector")?,
        operating_margin: row.try_get("operating_margin")?,
        ebitda: row.try_get("ebitda")?,
        total_debt: row.try_get("total_debt")?,
        total_cash: row.try_get("total_cash")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::current_timestamp;
    use chrono::Utc;
    use tempfile::tempdir;

    fn record(ticker: &str) -> StockRecord {
        StockRecord {
            ticker: ticker.to_string(),
            name: "Test Co".to_string(),
            price: 100.0,
            pe: 12.0,
            pbv: 1.5,
            roe: 0.11,
            div_yield: 0.04,
            operating_margin: 0.3,
            ebitda: 1.0e9,
            total_debt: 2.0e9,
            total_cash: 3.0e9,
            recommendation: "buy".to_string(),
            market_cap: 5.0e10,
            beta: 1.1,
            sector: "Financial Services".to_string(),
            sector_pe_avg: 0.0,
            sector_margin_avg: 0.0,
            last_updated: current_timestamp(),
        }
    }

    async fn create_legacy_db(path: &Path) {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();
        sqlx::query(
            "CREATE TABLE stocks (ticker TEXT PRIMARY KEY, price REAL, pe REAL, \
             pbv REAL, roe REAL, div_yield REAL, last_updated TIMESTAMP)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO stocks (ticker, price, pe, pbv, roe, div_yield, last_updated) \
             VALUES ('OLD.WA', 10.0, 5.0, 1.0, 0.1, 0.02, '2024-01-01 00:00:00')",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool.close().await;
    }

    #[tokio::test]
    async fn test_store_creation() {
        let temp_dir = tempdir().unwrap();
        let store = StockStore::new(temp_dir.path().join("test.db")).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.database_path().exists());
        store.close().await;
    }

    #[tokio::test]
    async fn test_upsert_round_trip() {
        let temp_dir = tempdir().unwrap();
        let store = StockStore::new(temp_dir.path().join("test.db")).await.unwrap();

        store.upsert(&record("PKO.WA")).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        let cached = store.get("PKO.WA").await.unwrap().unwrap();
        assert!(cached.is_complete());
        assert!(cached.is_fresh(Utc::now()));
        let promoted = cached.into_complete().unwrap();
        assert_eq!(promoted.name, "Test Co");
        assert_eq!(promoted.price, 100.0);
        assert_eq!(promoted.ebitda, 1.0e9);

        // Second upsert for the same ticker replaces, not duplicates
        let mut updated = record("PKO.WA");
        updated.price = 123.0;
        store.upsert(&updated).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        let cached = store.get("PKO.WA").await.unwrap().unwrap();
        assert_eq!(cached.price, 123.0);

        assert!(store.get("MISSING.WA").await.unwrap().is_none());
        store.close().await;
    }

    #[tokio::test]
    async fn test_all_in_ticker_order() {
        let temp_dir = tempdir().unwrap();
        let store = StockStore::new(temp_dir.path().join("test.db")).await.unwrap();

        for ticker in ["PZU.WA", "ALE.WA", "KGH.WA"] {
            store.upsert(&record(ticker)).await.unwrap();
        }

        let all = store.all().await.unwrap();
        let tickers: Vec<&str> = all.iter().map(|c| c.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["ALE.WA", "KGH.WA", "PZU.WA"]);
        store.close().await;
    }

    #[tokio::test]
    async fn test_migration_preserves_legacy_rows() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("legacy.db");
        create_legacy_db(&db_path).await;

        let store = StockStore::new(db_path).await.unwrap();
        let cached = store.get("OLD.WA").await.unwrap().unwrap();

        // Pre-migration data survives; new columns read back as NULL
        assert_eq!(cached.price, 10.0);
        assert_eq!(cached.name, None);
        assert_eq!(cached.market_cap, None);
        assert_eq!(cached.operating_margin, None);
        assert!(!cached.is_complete());
        store.close().await;
    }

    #[tokio::test]
    async fn test_migration_is_idempotent() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let store = StockStore::new(db_path.clone()).await.unwrap();
        store.upsert(&record("PKO.WA")).await.unwrap();
        store.close().await;

        // Reopening replays the migration list without error or data loss
        let store = StockStore::new(db_path).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        let columns = sqlx::query("PRAGMA table_info(stocks)")
            .fetch_all(&store.pool)
            .await
            .unwrap();
        assert_eq!(columns.len(), 7 + MIGRATED_COLUMNS.len());
        store.close().await;
    }

    #[tokio::test]
    async fn test_expire_all_forces_staleness() {
        let temp_dir = tempdir().unwrap();
        let store = StockStore::new(temp_dir.path().join("test.db")).await.unwrap();

        store.upsert(&record("PKO.WA")).await.unwrap();
        store.upsert(&record("PZU.WA")).await.unwrap();

        let expired = store.expire_all().await.unwrap();
        assert_eq!(expired, 2);

        for cached in store.all().await.unwrap() {
            assert_eq!(cached.last_updated, EXPIRED_SENTINEL);
            assert!(!cached.is_fresh(Utc::now()));
            // Still structurally complete, only the TTL arm trips
            assert!(cached.is_complete());
        }
        store.close().await;
    }
}
