//! Cross-cutting plumbing shared by Rollcall services: time source, tracing setup,
//! HTTP middleware, env-var helpers and serde adapters.

pub mod clock;
pub mod config;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
