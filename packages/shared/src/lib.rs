//! Shared utilities for the arrboard workspace.
//!
//! Both the reference server and the dashboard client depend on this crate
//! for clock abstraction, timestamp conversion and logging setup.

pub mod logger;
pub mod time;
