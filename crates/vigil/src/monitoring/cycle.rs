use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::checker::ProbeClient;
use super::executor::CheckExecutor;
use super::gate::{ReferenceGate, ReferenceHealth};
use super::network::Connectivity;
use super::retention::Retention;
use super::scheduler::{CycleRunner, ScheduleState};
use super::targets::TargetSource;
use super::types::TargetConfig;
use crate::config::MonitoringConfig;
use crate::database::ResultStore;
use crate::status::{AlertDebouncer, AlertDecision, AlertState, NotificationSink, StatusDeriver, StatusReport};

/// Collaborators a [`CheckCycle`] talks to.
pub struct CycleDeps {
    pub targets: Arc<dyn TargetSource>,
    pub store: Arc<dyn ResultStore>,
    pub probe_client: Arc<dyn ProbeClient>,
    pub connectivity: Arc<dyn Connectivity>,
    pub sink: Arc<dyn NotificationSink>,
}

/// What the probing phase of a cycle did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeSummary {
    pub timestamp_utc: i64,
    pub purged: Option<u64>,
    pub probed: usize,
    pub inserted: usize,
    pub insert_failures: usize,
    pub skipped: usize,
    pub reference: ReferenceHealth,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    /// `None` when probing was skipped for lack of network.
    pub probe: Option<ProbeSummary>,
    pub status: StatusReport,
    pub alert: AlertDecision,
}

/// One full check cycle: purge, probe, gate, persist, derive, notify.
pub struct CheckCycle {
    targets: Arc<dyn TargetSource>,
    store: Arc<dyn ResultStore>,
    executor: CheckExecutor,
    gate: ReferenceGate,
    retention: Retention,
    deriver: StatusDeriver,
    debouncer: AlertDebouncer,
    connectivity: Arc<dyn Connectivity>,
    sink: Arc<dyn NotificationSink>,
    schedule_state: Arc<ScheduleState>,
    alert_state: Mutex<AlertState>,
}

fn lock(state: &Mutex<AlertState>) -> MutexGuard<'_, AlertState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl CheckCycle {
    pub fn new(settings: &MonitoringConfig, deps: CycleDeps, schedule_state: Arc<ScheduleState>) -> Self {
        Self {
            retention: Retention::new(Arc::clone(&deps.store), settings.purge_older_than()),
            executor: CheckExecutor::new(deps.probe_client),
            gate: ReferenceGate::new(settings.reference_success_ratio),
            deriver: StatusDeriver::new(settings.status_latest_period(), settings.stale_after()),
            debouncer: AlertDebouncer::new(settings.error_notification_norepeat()),
            targets: deps.targets,
            store: deps.store,
            connectivity: deps.connectivity,
            sink: deps.sink,
            schedule_state,
            alert_state: Mutex::new(AlertState::default()),
        }
    }

    /// Start from a known alert state instead of `Clear`.
    pub fn with_alert_state(self, state: AlertState) -> Self {
        *lock(&self.alert_state) = state;
        self
    }

    pub fn alert_state(&self) -> AlertState {
        *lock(&self.alert_state)
    }

    pub async fn run(&self) -> Result<CycleReport> {
        let targets = self.targets.list_targets().context("failed to list targets")?;

        let probe = if self.connectivity.is_available() {
            self.schedule_state.mark_cycle_run(chrono::Utc::now().timestamp());
            Some(self.probe_targets(&targets).await)
        } else {
            info!("no network available, skipping check cycle...");
            None
        };

        let (status, alert) = self.derive_notification_status(&targets).await?;
        Ok(CycleReport { probe, status, alert })
    }

    async fn probe_targets(&self, targets: &[TargetConfig]) -> ProbeSummary {
        info!(targets = targets.len(), "running check cycle");

        let purged = match self.retention.purge().await {
            Ok(deleted) => Some(deleted),
            Err(e) => {
                warn!("failed to purge expired check results: {}", e);
                None
            }
        };

        let timestamp_utc = chrono::Utc::now().timestamp();
        let by_id: HashMap<String, TargetConfig> =
            targets.iter().map(|t| (t.id.clone(), t.clone())).collect();

        let mut results = self.executor.execute(targets, timestamp_utc).await;
        let reference = self.gate.apply(&mut results, &by_id);
        if reference.total > 0 {
            info!(
                total = reference.total,
                succeeded = reference.succeeded,
                ratio = reference.ratio(),
                "reference targets evaluated"
            );
        }

        let mut inserted = 0;
        let mut insert_failures = 0;
        for result in &results {
            debug!(
                target_id = %result.target_id,
                succeeded = result.succeeded,
                skip = result.skip,
                error = result.error_message.as_deref().unwrap_or(""),
                "check result"
            );
            match self.store.insert(result).await {
                Ok(_) => inserted += 1,
                Err(e) => {
                    error!(target_id = %result.target_id, "failed to persist check result: {}", e);
                    insert_failures += 1;
                }
            }
        }

        ProbeSummary {
            timestamp_utc,
            purged,
            probed: results.len(),
            inserted,
            insert_failures,
            skipped: results.iter().filter(|r| r.skip).count(),
            reference,
        }
    }

    async fn derive_notification_status(
        &self,
        targets: &[TargetConfig],
    ) -> Result<(StatusReport, AlertDecision)> {
        let now = chrono::Utc::now().timestamp();
        let status = self
            .deriver
            .derive_from_store(self.store.as_ref(), targets, now)
            .await
            .context("failed to read recent check results")?;

        self.sink.update_status(Some(status.failed_checks), Some(status.stale_checks));

        let decision = {
            let mut state = lock(&self.alert_state);
            self.debouncer.evaluate(&mut state, status.failed_checks, status.stale_checks, now)
        };
        match decision {
            AlertDecision::Raise { failed, stale } => self.sink.raise(failed, stale),
            AlertDecision::Clear => self.sink.clear(),
            AlertDecision::Suppressed => {}
        }

        Ok((status, decision))
    }
}

#[async_trait::async_trait]
impl CycleRunner for CheckCycle {
    async fn run_cycle(&self) -> Result<()> {
        self.run().await.map(|_| ())
    }
}
