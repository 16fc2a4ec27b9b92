//! UI layer: HTTP routes and the realtime WebSocket endpoint.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
pub use signal::shutdown_signal;
