//! Realtime broadcast client
//!
//! ## 概要
//!
//! `client` holds channel subscriptions and dispatches frames to listeners;
//! `connection` owns the WebSocket and reconnects it.

pub mod client;
pub mod connection;

pub use client::{ChannelHandle, EventCallback, LazyRealtime, RealtimeClient, SyncCallback};
pub use connection::ConnectionStatus;
