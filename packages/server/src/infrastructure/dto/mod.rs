//! Data Transfer Objects (DTOs) shared with the dashboard client.
//!
//! DTOs are organized by protocol:
//! - `http`: REST request and response bodies
//! - `realtime`: WebSocket frames of the broadcast relay

pub mod conversion;
pub mod http;
pub mod realtime;
