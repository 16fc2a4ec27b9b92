//! WebSocket frames of the realtime broadcast relay.
//!
//! Every frame is a JSON text message tagged by `type`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Channel names
pub mod channel {
    pub const CHAT: &str = "chat";
    pub const VIDEOS: &str = "videos";
    pub const CONFIG: &str = "config";
    pub const PRESENCE: &str = "presence";
}

/// Broadcast event names
pub mod event {
    pub const NEW_MESSAGE: &str = "new_message";
    pub const DELETE_MESSAGE: &str = "delete_message";
    pub const USERS_CHANGED: &str = "users_changed";
    pub const VIDEOS_CHANGED: &str = "videos_changed";
    pub const PLAY_NOW: &str = "play_now";
    pub const CONFIG_CHANGED: &str = "config_changed";
    /// Presence snapshot notification (client side only)
    pub const SYNC: &str = "sync";
}

/// Full presence state of a channel: key to the metas tracked under it
pub type PresenceState = BTreeMap<String, Vec<Value>>;

/// Frames sent by clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Join {
        channel: String,
    },
    Leave {
        channel: String,
    },
    Broadcast {
        channel: String,
        event: String,
        payload: Value,
    },
    Track {
        channel: String,
        key: String,
        meta: Value,
    },
}

/// Frames sent by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Broadcast {
        channel: String,
        event: String,
        payload: Value,
    },
    PresenceState {
        channel: String,
        state: PresenceState,
    },
}

/// Payload of `delete_message`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteMessagePayload {
    pub id: String,
}

/// Payload of `play_now`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayNowPayload {
    pub youtube_id: String,
}

/// Meta tracked on the presence channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceMeta {
    pub user_name: String,
}
