use std::path::Path;

use async_trait::async_trait;
use libsql::{Row, params};
use tracing::debug;

use super::StoreError;
use super::migrations::run_migrations;
use crate::monitoring::types::{CheckResult, Verdict};
use crate::config::DatabaseConfig;
use crate::pool::{DEFAULT_POOL_SIZE, LibsqlManager, LibsqlPool, open_local};

/// Persistent history of check results.
///
/// Ages are in seconds and relative to the store's current time.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Insert one result and return the id assigned to it.
    async fn insert(&self, result: &CheckResult) -> Result<i64, StoreError>;

    /// Delete every result older than `age_seconds`, returning the number removed.
    async fn delete_older_than(&self, age_seconds: i64) -> Result<u64, StoreError>;

    /// Results no older than `age_seconds`, ascending by timestamp.
    async fn query_by_period(&self, age_seconds: i64) -> Result<Vec<CheckResult>, StoreError>;

    /// Every stored result, ascending by timestamp.
    async fn query_all(&self) -> Result<Vec<CheckResult>, StoreError>;

    /// Results of one target no older than `age_seconds`, ascending by timestamp.
    async fn query_target(
        &self,
        target_id: &str,
        age_seconds: i64,
    ) -> Result<Vec<CheckResult>, StoreError>;
}

const SELECT_COLUMNS: &str = "SELECT id, timestamp_utc, target_id, status_code_ok, content_ok, \
                              error_message, succeeded, skip FROM check_results";

/// libsql implementation of [`ResultStore`].
pub struct LibsqlStore {
    pool: LibsqlPool,
}

impl LibsqlStore {
    /// Open (or create) the database file and run pending migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_pool_size(path, DEFAULT_POOL_SIZE).await
    }

    pub async fn from_config(config: &DatabaseConfig) -> Result<Self, StoreError> {
        Self::open_with_pool_size(&config.path, config.pool_size).await
    }

    pub async fn open_with_pool_size(
        path: impl AsRef<Path>,
        pool_size: usize,
    ) -> Result<Self, StoreError> {
        let pool = open_local(path.as_ref(), pool_size).await?;

        let store = Self::new_from_pool(pool);
        store.initialize().await?;
        debug!(path = %path.as_ref().display(), "result store opened");
        Ok(store)
    }

    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    pub async fn initialize(&self) -> Result<(), StoreError> {
        let conn = self.get_conn().await?;
        run_migrations(&conn).await
    }

    async fn get_conn(&self) -> Result<deadpool::managed::Object<LibsqlManager>, StoreError> {
        Ok(self.pool.get().await?)
    }

    async fn select(
        &self,
        clause: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<CheckResult>, StoreError> {
        let conn = self.get_conn().await?;
        let sql = format!("{SELECT_COLUMNS} {clause} ORDER BY timestamp_utc ASC, id ASC");
        let mut rows = conn.query(&sql, params).await?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await? {
            results.push(row_to_result(&row)?);
        }
        Ok(results)
    }
}

fn cutoff(age_seconds: i64) -> i64 {
    chrono::Utc::now().timestamp().saturating_sub(age_seconds)
}

fn verdict_to_column(verdict: Verdict) -> Option<i64> {
    verdict.as_column().map(i64::from)
}

fn verdict_from_column(value: Option<i64>) -> Verdict {
    Verdict::from_column(value.map(|v| v != 0))
}

fn row_to_result(row: &Row) -> Result<CheckResult, StoreError> {
    let succeeded: i64 = row.get(6)?;
    let skip: i64 = row.get(7)?;
    let target_id: String = row.get(2)?;
    if target_id.is_empty() {
        return Err(StoreError::Decode("empty target_id".to_string()));
    }

    Ok(CheckResult {
        id: Some(row.get(0)?),
        timestamp_utc: row.get(1)?,
        target_id,
        status_code_ok: verdict_from_column(row.get(3)?),
        content_ok: verdict_from_column(row.get(4)?),
        error_message: row.get(5)?,
        succeeded: succeeded != 0,
        skip: skip != 0,
    })
}

#[async_trait]
impl ResultStore for LibsqlStore {
    async fn insert(&self, result: &CheckResult) -> Result<i64, StoreError> {
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT INTO check_results (timestamp_utc, target_id, status_code_ok, content_ok, error_message, succeeded, skip) VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                result.timestamp_utc,
                result.target_id.clone(),
                verdict_to_column(result.status_code_ok),
                verdict_to_column(result.content_ok),
                result.error_message.clone(),
                i64::from(result.succeeded),
                i64::from(result.skip)
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn delete_older_than(&self, age_seconds: i64) -> Result<u64, StoreError> {
        let conn = self.get_conn().await?;
        let deleted = conn
            .execute("DELETE FROM check_results WHERE timestamp_utc < ?", params![cutoff(age_seconds)])
            .await?;
        Ok(deleted)
    }

    async fn query_by_period(&self, age_seconds: i64) -> Result<Vec<CheckResult>, StoreError> {
        self.select("WHERE timestamp_utc >= ?", params![cutoff(age_seconds)]).await
    }

    async fn query_all(&self) -> Result<Vec<CheckResult>, StoreError> {
        self.select("", ()).await
    }

    async fn query_target(
        &self,
        target_id: &str,
        age_seconds: i64,
    ) -> Result<Vec<CheckResult>, StoreError> {
        self.select(
            "WHERE target_id = ? AND timestamp_utc >= ?",
            params![target_id.to_string(), cutoff(age_seconds)],
        )
        .await
    }
}
