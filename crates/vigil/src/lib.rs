//! vigil - a personal uptime monitor.
//!
//! A check cycle probes every configured target concurrently, discounts the
//! results when the reference targets suggest the host itself is offline,
//! persists them, and derives failed/stale counts that drive a debounced
//! alert. [`status::TimelineBuilder`] renders the same history as display
//! segments on demand.

pub mod config;
pub mod database;
pub mod monitoring;
pub mod pool;
pub mod status;
pub mod time;

pub use config::{Config, ConfigError};
pub use database::{LibsqlStore, ResultStore, StoreError};
pub use monitoring::{
    CheckCycle, CheckResult, RunMode, ScheduleState, Scheduler, TargetConfig, TriggerOutcome,
};
pub use status::{NotificationSink, StatusDeriver, StatusReport, TimelineBuilder};
