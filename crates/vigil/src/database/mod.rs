/// Persistence of check results.
///
/// [`ResultStore`] is the seam the engine talks to; [`LibsqlStore`] keeps the
/// history in a local libsql (SQLite) file behind a deadpool connection pool.
pub mod migrations;
pub mod repository;

pub use repository::{LibsqlStore, ResultStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Libsql(#[from] libsql::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool::managed::PoolError<libsql::Error>),
    #[error("failed to build connection pool: {0}")]
    Build(#[from] deadpool::managed::BuildError),
    #[error("failed to create database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed row: {0}")]
    Decode(String),
}
