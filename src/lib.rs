//! # navguard
//!
//! Checks every top-level browser navigation against a URL reputation
//! service and sends the tab to a warning page when the verdict is unsafe.
//! The browser side is a thin shim; this crate runs as its native messaging
//! host and owns the decision logic, the verdict cache, the allowlist and
//! the VPN proxy settings.

pub mod abstractions;
pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod host;
pub mod logging;
pub mod store;

pub use error::{GuardError, Result};
