//! Test utilities for Rollcall services.
//!
//! Provides `ManualClock` and `MockIdentity`.
//! Import in `#[cfg(test)]` blocks and integration tests only, never in production code.

pub mod auth;
pub mod clock;
