use serde::Serialize;

/// Receives the engine's notification decisions. Rendering is up to the
/// implementation.
pub trait NotificationSink: Send + Sync {
    /// A failure alert should be shown (or shown again).
    fn raise(&self, failed: usize, stale: usize);

    /// Any standing failure alert should be withdrawn.
    fn clear(&self);

    /// Refresh the always-visible status line. `None` counts mean no cycle
    /// has been evaluated yet.
    fn update_status(&self, failed: Option<usize>, stale: Option<usize>);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Init,
    Ok,
    Warning,
    Error,
}

impl StatusLevel {
    pub fn from_counts(failed: Option<usize>, stale: Option<usize>) -> Self {
        match (failed, stale) {
            (Some(0), Some(0)) => StatusLevel::Ok,
            (Some(0), Some(_)) => StatusLevel::Warning,
            (Some(_), Some(_)) => StatusLevel::Error,
            _ => StatusLevel::Init,
        }
    }
}

/// One-line human summary of the counts.
pub fn status_text(failed: Option<usize>, stale: Option<usize>) -> String {
    match (failed, stale) {
        (Some(0), Some(0)) => "all checks ok".to_string(),
        (Some(failed), Some(0)) => format!("{failed} failed"),
        (Some(0), Some(stale)) => format!("{stale} stale"),
        (Some(failed), Some(stale)) => format!("{failed} failed, {stale} stale"),
        _ => "initialising".to_string(),
    }
}
