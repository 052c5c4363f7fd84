//! Background polling of the list endpoint.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::controller::ShoppingController;

pub const POLL_INTERVAL: Duration = Duration::from_millis(2_000);

pub struct SyncLoop {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SyncLoop {
    /// Polls every `period`, first tick one period from now. Failures only
    /// reach the sync indicator; the loop keeps going with no backoff.
    pub fn spawn(controller: Arc<ShoppingController>, period: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(period_ms = period.as_millis() as u64, "sync loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        if let Err(err) = controller.poll_once().await {
                            debug!(error = %err, "poll failed; will retry next tick");
                        }
                    }
                }
            }
            info!("sync loop stopped");
        });
        Self { shutdown, task }
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}
