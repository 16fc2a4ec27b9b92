//! Reference backend for the arrboard dashboard.
//!
//! Serves the REST endpoints the dashboard client consumes (config, messages,
//! preferences, videos) and relays realtime broadcast channels with presence
//! over a single WebSocket endpoint. Storage is in memory.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
