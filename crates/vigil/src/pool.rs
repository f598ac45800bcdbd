use std::path::Path;
use std::time::Duration;

use deadpool::managed::{self, Pool, RecycleResult};
use libsql::{Connection, Database, Error as LibsqlError};
use tracing::debug;

use crate::database::StoreError;

pub const DEFAULT_POOL_SIZE: usize = 4;

/// How long a statement waits for a lock held by another process on the same file.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Hands out connections to one local database file. The monitor and the
/// display server may both hold it open.
pub struct LibsqlManager {
    database: Database,
    busy_timeout: Duration,
}

impl LibsqlManager {
    pub fn new(database: Database) -> Self {
        Self { database, busy_timeout: DEFAULT_BUSY_TIMEOUT }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }
}

/// Run a pragma and return its first column, if it reports one.
async fn pragma(conn: &Connection, statement: &str) -> Result<Option<String>, LibsqlError> {
    let mut rows = conn.query(statement, ()).await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row.get_str(0).map(str::to_string).unwrap_or_default())),
        None => Ok(None),
    }
}

impl managed::Manager for LibsqlManager {
    type Type = Connection;
    type Error = LibsqlError;

    async fn create(&self) -> Result<Self::Type, Self::Error> {
        let conn = self.database.connect()?;
        pragma(&conn, &format!("PRAGMA busy_timeout = {}", self.busy_timeout.as_millis())).await?;
        Ok(conn)
    }

    async fn recycle(
        &self,
        conn: &mut Self::Type,
        _: &managed::Metrics,
    ) -> RecycleResult<Self::Error> {
        conn.query("SELECT 1", ()).await?.next().await?.ok_or(LibsqlError::QueryReturnedNoRows)?;
        Ok(())
    }
}

pub type LibsqlPool = Pool<LibsqlManager>;

/// Open (or create) a database file and pool connections to it. The file is
/// switched to WAL so readers don't block the cycle's writes.
pub async fn open_local(path: &Path, max_size: usize) -> Result<LibsqlPool, StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let database = libsql::Builder::new_local(path).build().await?;
    let pool: LibsqlPool = Pool::builder(LibsqlManager::new(database)).max_size(max_size).build()?;

    let conn = pool.get().await?;
    let mode = pragma(&*conn, "PRAGMA journal_mode = WAL").await?;
    debug!(path = %path.display(), max_size, journal_mode = mode.as_deref().unwrap_or("unknown"), "database pool ready");

    Ok(pool)
}
