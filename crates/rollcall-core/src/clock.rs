//! Wall-clock time source.
//!
//! Every expiry comparison in Rollcall goes through a [`Clock`] so tests can
//! substitute a manually advanced clock.

use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Shared handle to a clock, cloned into every use case that compares instants.
pub type SharedClock = Arc<dyn Clock>;

/// Reads the system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl SystemClock {
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}
