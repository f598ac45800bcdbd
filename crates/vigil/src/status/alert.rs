use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::time::whole_secs;

/// Default minimum time between repeated alerts for a standing failure.
pub const DEFAULT_NOREPEAT_WINDOW: Duration = Duration::from_secs(3600);

/// Alert bookkeeping, owned by whoever drives the [`AlertDebouncer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertState {
    pub last_alert_raised_at_utc: Option<i64>,
}

impl AlertState {
    pub fn is_alerting(&self) -> bool {
        self.last_alert_raised_at_utc.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AlertDecision {
    /// Emit an alert carrying the current counts.
    Raise { failed: usize, stale: usize },
    /// Failure persists but the last alert is too recent.
    Suppressed,
    /// No failures: withdraw any standing alert.
    Clear,
}

/// Decides when to (re)raise or clear the failure alert.
///
/// Only the failure count drives transitions; staleness rides along as
/// information in the raised alert.
#[derive(Debug, Clone, Copy)]
pub struct AlertDebouncer {
    norepeat_window: Duration,
}

impl Default for AlertDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_NOREPEAT_WINDOW)
    }
}

impl AlertDebouncer {
    pub fn new(norepeat_window: Duration) -> Self {
        Self { norepeat_window }
    }

    pub fn evaluate(
        &self,
        state: &mut AlertState,
        failed: usize,
        stale: usize,
        now: i64,
    ) -> AlertDecision {
        if failed == 0 {
            if state.is_alerting() {
                info!("all checks recovered, clearing alert");
            }
            state.last_alert_raised_at_utc = None;
            return AlertDecision::Clear;
        }

        let window = whole_secs(self.norepeat_window);
        let due = state.last_alert_raised_at_utc.is_none_or(|raised| now - raised > window);
        if due {
            state.last_alert_raised_at_utc = Some(now);
            info!(failed, stale, "raising alert");
            AlertDecision::Raise { failed, stale }
        } else {
            debug!(failed, stale, "alert already raised recently, suppressing repeat");
            AlertDecision::Suppressed
        }
    }
}
