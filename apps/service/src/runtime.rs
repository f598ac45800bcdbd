use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::info;
use vigil::config::{self, Config};
use vigil::monitoring::{
    CheckCycle, CycleDeps, CycleReport, DefaultInterface, FileTargets, HttpProbeClient, RunMode,
    ScheduleState, Scheduler, TargetSource, spawn_network_watcher,
};
use vigil::status::{NotificationSink, StatusDeriver, StatusReport, TargetStatus, status_text};
use vigil::{LibsqlStore, ResultStore};

use crate::notifier::LogNotifier;

/// Loaded configuration plus the path it came from.
pub struct Runtime {
    config: Config,
    config_path: PathBuf,
}

/// Everything a running monitor is made of.
struct Engine {
    cycle: Arc<CheckCycle>,
    scheduler: Scheduler,
    sink: Arc<dyn NotificationSink>,
}

impl Runtime {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = config::resolve_config_path(path)?;
        let config = Config::from_config(Some(&config_path))
            .with_context(|| format!("failed to load config from {}", config_path.display()))?;
        info!(path = %config_path.display(), targets = config.targets.len(), "configuration loaded");
        Ok(Self { config, config_path })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn open_store(&self) -> Result<Arc<dyn ResultStore>> {
        let store = LibsqlStore::from_config(&self.config.database).await.with_context(|| {
            format!("failed to open database {}", self.config.database.path.display())
        })?;
        Ok(Arc::new(store))
    }

    fn targets(&self) -> Arc<dyn TargetSource> {
        Arc::new(FileTargets::new(&self.config_path))
    }

    async fn engine(&self) -> Result<Engine> {
        let monitoring = &self.config.monitoring;
        let probe = &self.config.probe;
        let sink: Arc<dyn NotificationSink> = Arc::new(LogNotifier);
        let schedule_state = Arc::new(ScheduleState::default());

        let deps = CycleDeps {
            targets: self.targets(),
            store: self.open_store().await?,
            probe_client: Arc::new(HttpProbeClient::new(probe.connect_timeout(), probe.read_timeout())?),
            connectivity: Arc::new(DefaultInterface),
            sink: Arc::clone(&sink),
        };
        let cycle = Arc::new(CheckCycle::new(monitoring, deps, Arc::clone(&schedule_state)));
        let scheduler =
            Scheduler::new(cycle.clone(), schedule_state, monitoring.check_cycle_interval());

        Ok(Engine { cycle, scheduler, sink })
    }

    /// Run until ctrl-c, then let the in-flight cycle finish.
    pub async fn run(&self) -> Result<()> {
        let engine = self.engine().await?;
        engine.sink.update_status(None, None);

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let watcher = spawn_network_watcher(
            Arc::new(DefaultInterface),
            engine.scheduler.clone(),
            self.config.monitoring.network_poll_interval(),
            shutdown_rx,
        );

        engine.scheduler.trigger(RunMode::IfNecessary);
        info!("vigil monitor started");

        tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
        info!("interrupt received, waiting for the running cycle to finish");

        // Ignore errors if the watcher already stopped
        let _ = shutdown_tx.send(());
        watcher.await.context("network watcher panicked")?;
        engine.scheduler.shutdown().await;

        info!("vigil monitor stopped");
        Ok(())
    }

    pub async fn check_once(&self, json: bool) -> Result<()> {
        let engine = self.engine().await?;
        let report = engine.cycle.run().await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_report(&report);
        }
        Ok(())
    }

    pub async fn print_status(&self, json: bool) -> Result<()> {
        let monitoring = &self.config.monitoring;
        let store = self.open_store().await?;
        let targets = self.targets().list_targets()?;

        let deriver = StatusDeriver::new(monitoring.status_latest_period(), monitoring.stale_after());
        let now = chrono::Utc::now().timestamp();
        let report = deriver.derive_from_store(store.as_ref(), &targets, now).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            print_status(&report, now);
        }
        Ok(())
    }
}

fn print_report(report: &CycleReport) {
    match &report.probe {
        Some(probe) => {
            println!(
                "probed {} targets, stored {} ({} failed to store), {} skipped",
                probe.probed, probe.inserted, probe.insert_failures, probe.skipped
            );
            if probe.reference.total > 0 {
                println!(
                    "reference targets: {}/{} succeeded",
                    probe.reference.succeeded, probe.reference.total
                );
            }
        }
        None => println!("no network available, probing skipped"),
    }
    print_status(&report.status, chrono::Utc::now().timestamp());
}

fn print_status(report: &StatusReport, now: i64) {
    let mut targets: Vec<_> = report.targets.iter().collect();
    targets.sort_by(|a, b| a.url.cmp(&b.url));

    for target in targets {
        println!("{}", describe(target, now));
    }
    println!("{}", status_text(Some(report.failed_checks), Some(report.stale_checks)));
}

fn describe(target: &TargetStatus, now: i64) -> String {
    let state = match (target.failed, target.stale) {
        (true, true) => "FAILED, STALE",
        (true, false) => "FAILED",
        (false, true) => "STALE",
        (false, false) => "ok",
    };
    let age = target
        .latest
        .as_ref()
        .map(|r| format!("{}s ago", now - r.timestamp_utc))
        .unwrap_or_else(|| "never".to_string());
    let reference = if target.is_reference { " [reference]" } else { "" };
    format!("{:<12} {:<14} {}{} (last check {})", target.target_id, state, target.url, reference, age)
}
