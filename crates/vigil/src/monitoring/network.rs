//! Network availability: the cycle's "is there a network at all" check and
//! the watcher that turns "network became available" into a trigger.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::scheduler::{RunMode, Scheduler};

pub trait Connectivity: Send + Sync {
    fn is_available(&self) -> bool;
}

/// Considers the network available when the host has a default interface
/// with at least one address.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInterface;

impl Connectivity for DefaultInterface {
    fn is_available(&self) -> bool {
        match netdev::get_default_interface() {
            Ok(interface) => !interface.ipv4.is_empty() || !interface.ipv6.is_empty(),
            Err(e) => {
                debug!("no default network interface: {}", e);
                false
            }
        }
    }
}

/// Poll `connectivity` and trigger an `IfNecessary` cycle on every
/// unavailable → available transition, until `shutdown_rx` changes.
pub fn spawn_network_watcher(
    connectivity: Arc<dyn Connectivity>,
    scheduler: Scheduler,
    poll_interval: Duration,
    mut shutdown_rx: watch::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut available = connectivity.is_available();
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => break,

                _ = ticker.tick() => {
                    let now_available = connectivity.is_available();
                    if now_available && !available {
                        info!("new network available, trigger check cycle...");
                        scheduler.trigger(RunMode::IfNecessary);
                    } else if !now_available && available {
                        info!("network lost");
                    }
                    available = now_available;
                }
            }
        }
        debug!("network watcher stopped");
    })
}
