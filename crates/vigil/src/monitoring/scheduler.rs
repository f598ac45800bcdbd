use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::time::whole_secs;

/// Default period between check cycles.
pub const DEFAULT_CHECK_CYCLE_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// How a trigger wants the next cycle to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Run immediately.
    Now,
    /// Run immediately unless a cycle ran within the last interval.
    IfNecessary,
    /// Only make sure a future cycle is scheduled.
    ScheduleOnly,
}

/// What a trigger ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    /// A cycle is in flight; only the next periodic trigger was ensured.
    AlreadyRunning,
    Scheduled,
    /// The scheduler is shutting down.
    Ignored,
}

/// One unit of work the scheduler runs under mutual exclusion.
#[async_trait::async_trait]
pub trait CycleRunner: Send + Sync {
    async fn run_cycle(&self) -> anyhow::Result<()>;
}

/// Process-wide scheduling bookkeeping, shared between the scheduler and the
/// cycle it runs.
#[derive(Debug)]
pub struct ScheduleState {
    last_cycle_run_at_utc: AtomicI64,
    active: AtomicBool,
}

const NEVER: i64 = i64::MIN;

impl Default for ScheduleState {
    fn default() -> Self {
        Self { last_cycle_run_at_utc: AtomicI64::new(NEVER), active: AtomicBool::new(false) }
    }
}

impl ScheduleState {
    pub fn last_cycle_run_at_utc(&self) -> Option<i64> {
        match self.last_cycle_run_at_utc.load(Ordering::SeqCst) {
            NEVER => None,
            at => Some(at),
        }
    }

    pub fn mark_cycle_run(&self, now: i64) {
        self.last_cycle_run_at_utc.store(now, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Whether a trigger in `mode` should start a cycle right away.
pub fn should_run_now(mode: RunMode, last_run: Option<i64>, now: i64, interval: Duration) -> bool {
    match mode {
        RunMode::Now => true,
        RunMode::IfNecessary => {
            last_run.is_none_or(|last| now - last >= whole_secs(interval))
        }
        RunMode::ScheduleOnly => false,
    }
}

/// Single entry point for every event source (timer, network signal,
/// explicit request). At most one cycle is in flight at a time, and a
/// follow-up trigger is always armed after a cycle finishes.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    runner: Arc<dyn CycleRunner>,
    state: Arc<ScheduleState>,
    interval: Duration,
    worker: Mutex<Option<JoinHandle<()>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    timer_generation: AtomicU64,
    shutting_down: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Scheduler {
    pub fn new(runner: Arc<dyn CycleRunner>, state: Arc<ScheduleState>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                runner,
                state,
                interval,
                worker: Mutex::new(None),
                timer: Mutex::new(None),
                timer_generation: AtomicU64::new(0),
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn state(&self) -> &Arc<ScheduleState> {
        &self.inner.state
    }

    /// Must be called from within a tokio runtime.
    pub fn trigger(&self, mode: RunMode) -> TriggerOutcome {
        Inner::trigger(&self.inner, mode)
    }

    /// Wait for the in-flight cycle, if any, to finish.
    pub async fn wait_idle(&self) {
        let worker = lock(&self.inner.worker).take();
        if let Some(handle) = worker {
            if let Err(e) = handle.await {
                error!("check cycle worker did not complete: {}", e);
            }
        }
    }

    /// Stop accepting triggers, cancel the pending timer and join the
    /// in-flight cycle.
    pub async fn shutdown(&self) {
        info!("Shutting down scheduler");
        self.inner.shutting_down.store(true, Ordering::SeqCst);
        if let Some(timer) = lock(&self.inner.timer).take() {
            timer.abort();
        }
        self.wait_idle().await;
    }

    pub fn has_pending_timer(&self) -> bool {
        lock(&self.inner.timer).as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl Inner {
    fn trigger(this: &Arc<Self>, mode: RunMode) -> TriggerOutcome {
        if this.shutting_down.load(Ordering::SeqCst) {
            debug!(?mode, "trigger ignored during shutdown");
            return TriggerOutcome::Ignored;
        }

        let now = chrono::Utc::now().timestamp();
        if !should_run_now(mode, this.state.last_cycle_run_at_utc(), now, this.interval) {
            debug!(?mode, "no cycle needed now, ensuring next one is scheduled");
            Self::schedule_next(this);
            return TriggerOutcome::Scheduled;
        }

        let mut worker = lock(&this.worker);
        // shutdown sets the flag before it takes the worker handle
        if this.shutting_down.load(Ordering::SeqCst) {
            debug!(?mode, "trigger ignored during shutdown");
            return TriggerOutcome::Ignored;
        }
        if this.state.active.swap(true, Ordering::SeqCst) {
            debug!(?mode, "check cycle already running");
            drop(worker);
            Self::schedule_next(this);
            return TriggerOutcome::AlreadyRunning;
        }

        let inner = Arc::clone(this);
        *worker = Some(tokio::spawn(async move {
            let outcome = AssertUnwindSafe(inner.runner.run_cycle()).catch_unwind().await;
            match outcome {
                Ok(Ok(())) => debug!("check cycle completed"),
                Ok(Err(e)) => error!("check cycle failed: {:#}", e),
                Err(_) => error!("check cycle panicked"),
            }
            inner.state.active.store(false, Ordering::SeqCst);
            Self::schedule_next(&inner);
        }));

        info!(?mode, "check cycle started");
        TriggerOutcome::Started
    }

    /// Arm (or re-arm) the single periodic trigger.
    fn schedule_next(this: &Arc<Self>) {
        let mut slot = lock(&this.timer);
        if this.shutting_down.load(Ordering::SeqCst) {
            return;
        }

        let generation = this.timer_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(this);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(inner.interval).await;
            if inner.timer_generation.load(Ordering::SeqCst) == generation {
                Self::trigger(&inner, RunMode::IfNecessary);
            }
        });

        if let Some(previous) = slot.replace(timer) {
            previous.abort();
        }
        drop(slot);
        debug!(interval_secs = this.interval.as_secs(), "next check cycle scheduled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    const HOUR: Duration = Duration::from_secs(3600);

    /// Blocks every cycle until released and records concurrency.
    #[derive(Default)]
    struct GatedRunner {
        release: Notify,
        runs: AtomicUsize,
        running: AtomicUsize,
        max_running: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl CycleRunner for GatedRunner {
        async fn run_cycle(&self) -> anyhow::Result<()> {
            let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(running, Ordering::SeqCst);
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.release.notified().await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("store unavailable");
            }
            Ok(())
        }
    }

    #[test]
    fn run_mode_decision() {
        let interval = Duration::from_secs(900);

        assert!(should_run_now(RunMode::Now, Some(1_000), 1_000, interval));
        assert!(should_run_now(RunMode::IfNecessary, None, 1_000, interval));
        assert!(!should_run_now(RunMode::IfNecessary, Some(1_000), 1_899, interval));
        assert!(should_run_now(RunMode::IfNecessary, Some(1_000), 1_900, interval));
        assert!(!should_run_now(RunMode::ScheduleOnly, None, 1_000, interval));
    }

    #[tokio::test]
    async fn test_trigger_while_active_does_not_start_second_cycle() {
        let runner = Arc::new(GatedRunner::default());
        let scheduler = Scheduler::new(runner.clone(), Arc::new(ScheduleState::default()), HOUR);

        assert_eq!(scheduler.trigger(RunMode::Now), TriggerOutcome::Started);
        tokio::task::yield_now().await;
        assert_eq!(scheduler.trigger(RunMode::Now), TriggerOutcome::AlreadyRunning);
        assert!(scheduler.has_pending_timer());

        runner.release.notify_one();
        scheduler.wait_idle().await;

        assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
        assert_eq!(runner.max_running.load(Ordering::SeqCst), 1);
        assert!(!scheduler.state().is_active());
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_cycle_still_schedules_next() {
        let runner = Arc::new(GatedRunner { fail: true, ..Default::default() });
        let scheduler = Scheduler::new(runner.clone(), Arc::new(ScheduleState::default()), HOUR);

        assert_eq!(scheduler.trigger(RunMode::Now), TriggerOutcome::Started);
        assert!(!scheduler.has_pending_timer());
        runner.release.notify_one();
        scheduler.wait_idle().await;

        assert!(scheduler.has_pending_timer());
        assert!(!scheduler.state().is_active());
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_if_necessary_respects_last_run() {
        let runner = Arc::new(GatedRunner::default());
        let state = Arc::new(ScheduleState::default());
        state.mark_cycle_run(chrono::Utc::now().timestamp());
        let scheduler = Scheduler::new(runner.clone(), state, HOUR);

        assert_eq!(scheduler.trigger(RunMode::IfNecessary), TriggerOutcome::Scheduled);
        assert_eq!(scheduler.trigger(RunMode::ScheduleOnly), TriggerOutcome::Scheduled);
        assert_eq!(runner.runs.load(Ordering::SeqCst), 0);
        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_if_necessary_after_interval() {
        let runner = Arc::new(GatedRunner::default());
        let scheduler = Scheduler::new(runner.clone(), Arc::new(ScheduleState::default()), HOUR);

        assert_eq!(scheduler.trigger(RunMode::ScheduleOnly), TriggerOutcome::Scheduled);
        tokio::time::sleep(HOUR + Duration::from_secs(1)).await;
        tokio::task::yield_now().await;

        assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
        runner.release.notify_one();
        scheduler.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_joins_in_flight_cycle_and_ignores_triggers() {
        let runner = Arc::new(GatedRunner::default());
        let scheduler = Scheduler::new(runner.clone(), Arc::new(ScheduleState::default()), HOUR);

        scheduler.trigger(RunMode::Now);
        tokio::task::yield_now().await;

        let releaser = {
            let runner = runner.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                runner.release.notify_one();
            })
        };
        scheduler.shutdown().await;
        releaser.await.unwrap();

        assert_eq!(runner.running.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.trigger(RunMode::Now), TriggerOutcome::Ignored);
        assert!(!scheduler.has_pending_timer());
    }

    /// Short cycles that track how many are in flight.
    #[derive(Default)]
    struct BriefRunner {
        running: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CycleRunner for BriefRunner {
        async fn run_cycle(&self) -> anyhow::Result<()> {
            self.running.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(2)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_shutdown_joins_cycles_started_by_concurrent_triggers() {
        for _ in 0..20 {
            let runner = Arc::new(BriefRunner::default());
            let scheduler = Scheduler::new(runner.clone(), Arc::new(ScheduleState::default()), HOUR);

            let triggers: Vec<_> = (0..4)
                .map(|_| {
                    let scheduler = scheduler.clone();
                    tokio::spawn(async move {
                        while scheduler.trigger(RunMode::Now) != TriggerOutcome::Ignored {
                            tokio::task::yield_now().await;
                        }
                    })
                })
                .collect();

            tokio::time::sleep(Duration::from_millis(5)).await;
            scheduler.shutdown().await;

            assert_eq!(runner.running.load(Ordering::SeqCst), 0);
            assert!(!scheduler.state().is_active());
            assert!(!scheduler.has_pending_timer());
            for trigger in triggers {
                trigger.await.unwrap();
            }
        }
    }
}
