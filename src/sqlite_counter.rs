//! [`CounterStore`] persisted in SQLite.
//!
//! Counters live in one table keyed by counter name, with an absolute
//! expiry in unix seconds. [`consume`](CounterStore::consume) is a single
//! upsert statement, so the check and the increment cannot interleave
//! across connections.

use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use async_trait::async_trait;
use ask_rag_core::counter::CounterStore;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

pub struct SqliteCounterStore {
    pool: SqlitePool,
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

impl SqliteCounterStore {
    /// Open (creating if needed) the database at `path` and run migrations.
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rate_counters (
                key TEXT PRIMARY KEY,
                count INTEGER NOT NULL,
                expires_at INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_at(&self, key: &str, now: i64) -> Result<Option<u64>> {
        let count: Option<i64> = sqlx::query_scalar(
            "SELECT count FROM rate_counters WHERE key = ? AND (expires_at IS NULL OR expires_at > ?)",
        )
        .bind(key)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(count.map(|c| c as u64))
    }

    async fn consume_at(&self, key: &str, limit: u64, ttl_secs: u64, now: i64) -> Result<Option<u64>> {
        if limit == 0 {
            return Ok(None);
        }
        let expires_at = now + ttl_secs as i64;
        let count: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO rate_counters (key, count, expires_at) VALUES (?, 1, ?)
            ON CONFLICT(key) DO UPDATE SET
                count = CASE
                    WHEN rate_counters.expires_at IS NOT NULL AND rate_counters.expires_at <= ? THEN 1
                    ELSE rate_counters.count + 1
                END,
                expires_at = CASE
                    WHEN rate_counters.expires_at IS NOT NULL AND rate_counters.expires_at <= ? THEN excluded.expires_at
                    ELSE rate_counters.expires_at
                END
            WHERE (rate_counters.expires_at IS NOT NULL AND rate_counters.expires_at <= ?)
                OR rate_counters.count < ?
            RETURNING count
            "#,
        )
        .bind(key)
        .bind(expires_at)
        .bind(now)
        .bind(now)
        .bind(now)
        .bind(limit as i64)
        .fetch_optional(&self.pool)
        .await?;
        Ok(count.map(|c| c as u64))
    }
}

#[async_trait]
impl CounterStore for SqliteCounterStore {
    fn backend_name(&self) -> &str {
        "sqlite"
    }

    async fn get_if_present(&self, key: &str) -> Result<Option<u64>> {
        self.get_at(key, now_secs()).await
    }

    async fn set_with_expiry(&self, key: &str, value: u64, ttl_secs: u64) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO rate_counters (key, count, expires_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET count = excluded.count, expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value as i64)
        .bind(now_secs() + ttl_secs as i64)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn increment(&self, key: &str) -> Result<u64> {
        let now = now_secs();
        let count: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO rate_counters (key, count, expires_at) VALUES (?, 1, NULL)
            ON CONFLICT(key) DO UPDATE SET
                count = CASE
                    WHEN rate_counters.expires_at IS NOT NULL AND rate_counters.expires_at <= ? THEN 1
                    ELSE rate_counters.count + 1
                END,
                expires_at = CASE
                    WHEN rate_counters.expires_at IS NOT NULL AND rate_counters.expires_at <= ? THEN NULL
                    ELSE rate_counters.expires_at
                END
            RETURNING count
            "#,
        )
        .bind(key)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u64)
    }

    async fn consume(&self, key: &str, limit: u64, ttl_secs: u64) -> Result<Option<u64>> {
        self.consume_at(key, limit, ttl_secs, now_secs()).await
    }
}
