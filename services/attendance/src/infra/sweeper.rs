//! Periodic expiry sweep.
//!
//! Reads already treat expired challenges and codes as gone, so the sweep only
//! bounds storage growth. It runs until [`SweepHandle::shutdown`] is called.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::infra::memory::MemoryChallengeStore;
use crate::infra::store::SessionCodeStore;
use crate::usecase::sweep::SweepUseCase;

pub struct SweepHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweepHandle {
    /// Stop the loop and wait for an in-flight sweep to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "sweeper task ended abnormally");
        }
    }
}

pub fn spawn_sweeper(
    usecase: SweepUseCase<MemoryChallengeStore, SessionCodeStore>,
    every: Duration,
) -> SweepHandle {
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match usecase.execute().await {
                        Ok(report) if report.challenges_purged + report.codes_deactivated > 0 => {
                            info!(
                                challenges_purged = report.challenges_purged,
                                codes_deactivated = report.codes_deactivated,
                                "expiry sweep"
                            );
                        }
                        Ok(_) => debug!("expiry sweep found nothing to do"),
                        Err(e) => warn!(error = %e, "expiry sweep failed"),
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("sweeper stopped");
    });

    SweepHandle { shutdown, task }
}
