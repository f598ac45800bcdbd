use std::time::Duration;

use serde::Serialize;

use crate::database::{ResultStore, StoreError};
use crate::monitoring::types::{CheckResult, TargetConfig};
use crate::time::whole_secs;

/// Classification of one target at derivation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetStatus {
    pub target_id: String,
    pub url: String,
    pub is_reference: bool,
    /// Latest non-skipped result within the lookback window.
    pub latest: Option<CheckResult>,
    pub failed: bool,
    pub stale: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub failed_checks: usize,
    pub stale_checks: usize,
    pub targets: Vec<TargetStatus>,
}

/// Classifies every configured target as ok, failed and/or stale.
#[derive(Debug, Clone, Copy)]
pub struct StatusDeriver {
    lookback: Duration,
    stale_after: Duration,
}

impl StatusDeriver {
    pub fn new(lookback: Duration, stale_after: Duration) -> Self {
        Self { lookback, stale_after }
    }

    pub fn lookback(&self) -> Duration {
        self.lookback
    }

    /// Read the lookback window from `store` and derive from it.
    pub async fn derive_from_store(
        &self,
        store: &dyn ResultStore,
        targets: &[TargetConfig],
        now: i64,
    ) -> Result<StatusReport, StoreError> {
        let results = store.query_by_period(whole_secs(self.lookback)).await?;
        Ok(self.derive(targets, &results, now))
    }

    /// A target is failed when its latest usable result failed, and stale when
    /// it has no usable result or the latest one is older than `stale_after`.
    /// Having no result at all is stale but not failed.
    ///
    /// Reference targets only vouch for the host's own connectivity and are
    /// left out of the report.
    pub fn derive(&self, targets: &[TargetConfig], results: &[CheckResult], now: i64) -> StatusReport {
        let window_start = now - whole_secs(self.lookback);
        let stale_after = whole_secs(self.stale_after);

        let targets: Vec<TargetStatus> = targets
            .iter()
            .filter(|target| !target.is_reference)
            .map(|target| {
                let latest = results
                    .iter()
                    .filter(|r| r.target_id == target.id && !r.skip && r.timestamp_utc >= window_start)
                    .max_by_key(|r| r.timestamp_utc)
                    .cloned();

                let failed = latest.as_ref().is_some_and(|r| !r.succeeded);
                let stale = latest.as_ref().is_none_or(|r| now - r.timestamp_utc >= stale_after);

                TargetStatus {
                    target_id: target.id.clone(),
                    url: target.url.clone(),
                    is_reference: target.is_reference,
                    latest,
                    failed,
                    stale,
                }
            })
            .collect();

        StatusReport {
            failed_checks: targets.iter().filter(|t| t.failed).count(),
            stale_checks: targets.iter().filter(|t| t.stale).count(),
            targets,
        }
    }
}
