//! Age-based purge of persisted check results.
//!
//! Rows are only ever removed by age. Results of targets that were removed
//! from the configuration stay until they age out like any other row.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::database::{ResultStore, StoreError};
use crate::time::whole_secs;

/// Default horizon: one week.
pub const DEFAULT_PURGE_OLDER_THAN: Duration = Duration::from_secs(7 * 24 * 3600);

pub struct Retention {
    store: Arc<dyn ResultStore>,
    horizon: Duration,
}

impl Retention {
    pub fn new(store: Arc<dyn ResultStore>, horizon: Duration) -> Self {
        Self { store, horizon }
    }

    pub fn horizon(&self) -> Duration {
        self.horizon
    }

    /// Delete every result older than the horizon.
    pub async fn purge(&self) -> Result<u64, StoreError> {
        let deleted = self.store.delete_older_than(whole_secs(self.horizon)).await?;
        if deleted > 0 {
            info!(deleted, horizon_secs = self.horizon.as_secs(), "purged expired check results");
        } else {
            debug!("no expired check results to purge");
        }
        Ok(deleted)
    }
}
