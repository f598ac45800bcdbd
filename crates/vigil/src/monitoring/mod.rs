/// Monitoring engine module - everything that happens inside a check cycle
///
/// This module is responsible for:
/// - Probing targets over HTTP(S) ([`checker`]) concurrently ([`executor`])
/// - Discounting results taken while the host itself was offline ([`gate`])
/// - Purging old history ([`retention`])
/// - Deciding when cycles run ([`scheduler`]) and what one does ([`cycle`])
pub mod checker;
pub mod cycle;
pub mod executor;
pub mod gate;
pub mod network;
pub mod retention;
pub mod scheduler;
pub mod targets;
pub mod types;

pub use checker::{HttpProbeClient, ProbeClient};
pub use cycle::{CheckCycle, CycleDeps, CycleReport, ProbeSummary};
pub use executor::CheckExecutor;
pub use gate::{ReferenceGate, ReferenceHealth};
pub use network::{Connectivity, DefaultInterface, spawn_network_watcher};
pub use retention::Retention;
pub use scheduler::{CycleRunner, RunMode, ScheduleState, Scheduler, TriggerOutcome};
pub use targets::{FileTargets, StaticTargets, TargetSource};
pub use types::{CheckResult, ProbeOutcome, TargetConfig, Verdict};
