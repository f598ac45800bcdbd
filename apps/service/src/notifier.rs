use tracing::{info, warn};
use vigil::status::{NotificationSink, StatusLevel, status_text};

/// Renders notifications as log lines.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn raise(&self, failed: usize, stale: usize) {
        warn!(failed, stale, "ALERT: {}", status_text(Some(failed), Some(stale)));
    }

    fn clear(&self) {
        info!("no failing checks");
    }

    fn update_status(&self, failed: Option<usize>, stale: Option<usize>) {
        let level = StatusLevel::from_counts(failed, stale);
        match level {
            StatusLevel::Error | StatusLevel::Warning => {
                warn!(?level, "status: {}", status_text(failed, stale))
            }
            StatusLevel::Init | StatusLevel::Ok => info!(?level, "status: {}", status_text(failed, stale)),
        }
    }
}
