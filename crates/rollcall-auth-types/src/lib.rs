//! Auth types shared across Rollcall crates.
//!
//! Provides JWT issuing/validation, the access-token cookie builders, and the
//! `Identity` extractor.

pub mod cookie;
pub mod identity;
pub mod token;
