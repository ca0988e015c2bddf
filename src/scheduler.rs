//! Fixed-interval trigger for the refresh coordinator.
//!
//! A timer and nothing more: after a configured initial delay it invokes
//! the coordinator once per interval for the lifetime of the process,
//! logging the per-tick outcome so one failed tick never stops future
//! ticks. Cancellation is observed only between ticks — an in-flight
//! refresh always completes or fails on its own.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info};

use crate::refresh::RefreshCoordinator;

pub struct RefreshScheduler {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl RefreshScheduler {
    /// Spawn the tick loop. The first tick fires once `initial_delay`
    /// elapses, subsequent ticks every `tick_interval`; a tick that
    /// overruns the interval delays the next one rather than bursting.
    pub fn start(
        coordinator: Arc<RefreshCoordinator>,
        initial_delay: Duration,
        tick_interval: Duration,
    ) -> Self {
        let (shutdown, mut signal) = watch::channel(false);
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = sleep(initial_delay) => {}
                _ = signal.changed() => {
                    debug!("refresh loop cancelled before first tick");
                    return;
                }
            }

            let mut ticker = interval(tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = tick_interval.as_secs(), "refresh loop running");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let outcome = coordinator.tick().await;
                        debug!(?outcome, "refresh tick complete");
                    }
                    _ = signal.changed() => {
                        info!("refresh loop stopping");
                        break;
                    }
                }
            }
        });
        Self { shutdown, handle }
    }

    /// Stop future ticks and wait for the loop to wind down.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
