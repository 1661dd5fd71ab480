//! Utilities Module
//!
//! Logging and HTTP plumbing shared across the crate.

pub mod http;
pub mod logging;
