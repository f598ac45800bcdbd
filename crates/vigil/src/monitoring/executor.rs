use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error};

use super::checker::ProbeClient;
use super::types::{CheckResult, ProbeOutcome, TargetConfig};

/// Fans out one probe per target and joins every result.
pub struct CheckExecutor {
    client: Arc<dyn ProbeClient>,
}

impl CheckExecutor {
    pub fn new(client: Arc<dyn ProbeClient>) -> Self {
        Self { client }
    }

    /// Probe all targets concurrently and judge each outcome.
    ///
    /// Every result carries the same `timestamp_utc`, captured by the caller
    /// at cycle start. Results come back in target order. Probes run as
    /// spawned tasks, so dropping this future leaves them running to
    /// completion in the background with their results discarded.
    pub async fn execute(&self, targets: &[TargetConfig], timestamp_utc: i64) -> Vec<CheckResult> {
        let handles: Vec<_> = targets
            .iter()
            .map(|target| {
                let client = Arc::clone(&self.client);
                let url = target.url.clone();
                tokio::spawn(async move { client.probe(&url).await })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(targets)
            .map(|(joined, target)| {
                let outcome = joined.unwrap_or_else(|e| {
                    error!(target_id = %target.id, "probe task did not complete: {}", e);
                    ProbeOutcome::unreachable(format!("probe task did not complete: {e}"))
                });
                let result = CheckResult::evaluate(target, &outcome, timestamp_utc);
                debug!(
                    target_id = %target.id,
                    status_code = outcome.status_code,
                    succeeded = result.succeeded,
                    "probe finished"
                );
                result
            })
            .collect()
    }
}
