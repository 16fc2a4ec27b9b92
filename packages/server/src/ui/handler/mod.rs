//! Request handlers.

mod error;
mod http;
mod identity;
mod websocket;

pub use http::{
    delete_message, get_config, get_preferences, get_videos, health_check, list_messages,
    patch_preferences, post_message, put_config,
};
pub use websocket::websocket_handler;
