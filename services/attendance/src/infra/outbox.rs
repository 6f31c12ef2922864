//! Fire-and-forget OTP delivery.
//!
//! Use cases push deliveries onto a bounded channel after their store write
//! completes; a single worker drains it and hands each delivery to the mailer.
//! A full channel drops the delivery with a warning instead of blocking the caller.

use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::domain::repository::{Mailer, OtpNotifier};
use crate::domain::types::OtpDelivery;

#[derive(Clone)]
pub struct OutboxNotifier {
    tx: mpsc::Sender<OtpDelivery>,
}

impl OutboxNotifier {
    /// Create a notifier and the receiver its worker should drain.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<OtpDelivery>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl OtpNotifier for OutboxNotifier {
    fn enqueue(&self, delivery: OtpDelivery) {
        match self.tx.try_send(delivery) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                warn!(role = %dropped.role, "otp outbox full, delivery dropped");
            }
            Err(TrySendError::Closed(dropped)) => {
                warn!(role = %dropped.role, "otp outbox closed, delivery dropped");
            }
        }
    }
}

/// Deliver queued OTPs until every notifier is dropped.
pub async fn run_outbox<M: Mailer>(mut rx: mpsc::Receiver<OtpDelivery>, mailer: M) {
    while let Some(delivery) = rx.recv().await {
        match mailer.send(&delivery).await {
            Ok(()) => info!(role = %delivery.role, "otp delivered"),
            Err(e) => warn!(
                role = %delivery.role,
                error = format!("{e:#}"),
                "otp delivery failed"
            ),
        }
    }
    info!("otp outbox drained");
}

/// Wait up to `grace` for the worker to deliver what is still queued.
///
/// Every notifier must be dropped first or the worker never finishes.
/// Returns false when the worker failed or the grace period ran out.
pub async fn await_drain(worker: JoinHandle<()>, grace: Duration) -> bool {
    match tokio::time::timeout(grace, worker).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            warn!(error = %e, "otp outbox worker failed");
            false
        }
        Err(_) => {
            warn!(grace_ms = grace.as_millis() as u64, "otp outbox drain timed out");
            false
        }
    }
}
