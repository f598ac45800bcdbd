//! Turning persisted history into status: per-target classification, alert
//! debouncing, display timelines and the notification seam.

pub mod alert;
pub mod deriver;
pub mod notify;
pub mod timeline;

pub use alert::{AlertDebouncer, AlertDecision, AlertState};
pub use deriver::{StatusDeriver, StatusReport, TargetStatus};
pub use notify::{NotificationSink, StatusLevel, status_text};
pub use timeline::{Segment, TimelineBuilder};
