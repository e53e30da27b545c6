// ABOUTME: Repeating liveness sweep task with an explicit shutdown handle
// ABOUTME: Drives ConnectionRegistry::sweep on a fixed period until stopped or dropped
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2026 dravr.ai

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::ConnectionRegistry;

/// Handle to the background sweep task
///
/// The first sweep runs one period after spawning. Call [`shutdown`] to
/// stop it and wait for the task to finish; dropping the handle aborts it.
///
/// [`shutdown`]: LivenessSweeper::shutdown
pub struct LivenessSweeper {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl LivenessSweeper {
    /// Start sweeping `registry` every `period`
    pub fn spawn(registry: Arc<ConnectionRegistry>, period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        let report = registry.sweep().await;
                        if report.removed() > 0 {
                            info!(
                                pinged = report.pinged,
                                timed_out = report.timed_out,
                                closed = report.closed,
                                "Liveness sweep removed clients"
                            );
                        } else {
                            debug!(pinged = report.pinged, "Liveness sweep complete");
                        }
                    }
                }
            }

            debug!("Liveness sweeper stopped");
        });

        debug!(period_ms = period.as_millis() as u64, "Liveness sweeper started");

        Self {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Stop the sweep and wait for the task to exit
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Liveness sweeper task ended abnormally");
            }
        }
    }

    /// Whether the background task is still running
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for LivenessSweeper {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    const PERIOD: Duration = Duration::from_secs(15);

    #[tokio::test(start_paused = true)]
    async fn pings_each_period() {
        let registry = Arc::new(ConnectionRegistry::new(Duration::from_secs(30)));
        let (tx, mut rx) = mpsc::channel(8);
        registry.add_client("c1".to_owned(), tx).await;
        let sweeper = LivenessSweeper::spawn(Arc::clone(&registry), PERIOD);

        let connected = rx.recv().await.expect("connected");
        assert!(connected.contains("\"connected\""));

        time::sleep(Duration::from_secs(16)).await;
        let ping = rx.try_recv().expect("ping after one period");
        assert!(ping.contains("\"ping\""));

        sweeper.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn evicts_disconnected_client_on_next_tick() {
        let registry = Arc::new(ConnectionRegistry::new(Duration::from_secs(30)));
        let (tx, rx) = mpsc::channel(8);
        registry.add_client("c1".to_owned(), tx).await;
        drop(rx);
        let sweeper = LivenessSweeper::spawn(Arc::clone(&registry), PERIOD);

        assert_eq!(registry.client_count().await, 1);
        time::sleep(Duration::from_secs(16)).await;
        assert_eq!(registry.client_count().await, 0);

        sweeper.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_task() {
        let registry = Arc::new(ConnectionRegistry::new(Duration::from_secs(30)));
        let sweeper = LivenessSweeper::spawn(registry, PERIOD);
        assert!(sweeper.is_running());
        sweeper.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn drop_aborts_task() {
        let registry = Arc::new(ConnectionRegistry::new(Duration::from_secs(30)));
        let (tx, mut rx) = mpsc::channel(8);
        registry.add_client("c1".to_owned(), tx).await;
        let _ = rx.recv().await;

        drop(LivenessSweeper::spawn(Arc::clone(&registry), PERIOD));
        time::sleep(Duration::from_secs(40)).await;

        assert!(rx.try_recv().is_err(), "no pings after drop");
    }
}
