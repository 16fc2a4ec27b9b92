//! Realtime broadcast relay
//!
//! ## 概要
//!
//! Connections join named channels, broadcast events to the other members of
//! a channel and track presence metadata. Socket handling lives in the UI
//! layer (`ui/handler/websocket.rs`); this module only manages the senders.

pub mod hub;

pub use hub::{ConnectionChannel, ConnectionId, RealtimeHub};
