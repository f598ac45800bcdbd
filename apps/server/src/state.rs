use std::sync::Arc;

use serde::Serialize;
use vigil::config::MonitoringConfig;
use vigil::monitoring::TargetSource;
use vigil::time::whole_secs;
use vigil::{ResultStore, StatusDeriver, TimelineBuilder};

/// Shared by every worker of the display server.
pub struct AppState {
    pub store: Arc<dyn ResultStore>,
    pub targets: Arc<dyn TargetSource>,
    pub monitoring: MonitoringConfig,
}

/// Time span a response covers, in UTC seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Range {
    pub begin: i64,
    pub end: i64,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ResultStore>,
        targets: Arc<dyn TargetSource>,
        monitoring: MonitoringConfig,
    ) -> Self {
        Self { store, targets, monitoring }
    }

    pub fn deriver(&self) -> StatusDeriver {
        StatusDeriver::new(self.monitoring.status_latest_period(), self.monitoring.stale_after())
    }

    pub fn timeline(&self) -> TimelineBuilder {
        TimelineBuilder::new(
            self.monitoring.check_cycle_interval(),
            self.monitoring.retrograde_validity(),
        )
    }

    pub fn lookback_secs(&self) -> i64 {
        whole_secs(self.monitoring.status_latest_period())
    }

    pub fn range(&self, now: i64) -> Range {
        Range { begin: now - self.lookback_secs(), end: now }
    }
}
