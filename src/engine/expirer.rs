use crate::core::{EngineError, Result};
use crate::engine::BookingEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::info;

/// Handle to the background expiry sweeper.
///
/// The task keeps running until [`stop`] is called; dropping the handle
/// without stopping aborts the task instead.
///
/// [`stop`]: ReservationExpirer::stop
pub struct ReservationExpirer {
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl ReservationExpirer {
    pub async fn stop(mut self) -> Result<()> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(join_handle) = self.join_handle.take() {
            join_handle
                .await
                .map_err(|err| EngineError::TaskError(format!("expirer join: {err}")))?;
        }
        Ok(())
    }
}

impl Drop for ReservationExpirer {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}

/// Start the periodic expiry sweep over `engine`.
///
/// Every `interval` the worker runs one sweep, logging a summary whenever
/// the sweep reclaimed or failed anything. Intervals below 10ms are raised
/// to 10ms so a misconfigured worker cannot spin.
pub fn spawn_reservation_expirer(
    engine: Arc<BookingEngine>,
    interval: Duration,
) -> ReservationExpirer {
    let interval = interval.max(Duration::from_millis(10));
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let join_handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    break;
                }
                _ = sleep(interval) => {
                    let report = engine.run_expiry_tick().await;
                    if report.expired > 0 || report.failed > 0 {
                        info!(%report, "expiry sweep finished");
                    }
                }
            }
        }
    });

    ReservationExpirer {
        stop_tx: Some(stop_tx),
        join_handle: Some(join_handle),
    }
}
