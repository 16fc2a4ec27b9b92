//! Domain entities.

use serde::{Deserialize, Serialize};

use super::value_object::{MessageContent, MessageId, Timestamp, UserId};

/// Acting identity attached to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub user_name: String,
    pub is_admin: bool,
}

impl Identity {
    /// Whether this identity may delete a message authored by `author`
    pub fn can_delete(&self, author: &UserId) -> bool {
        self.is_admin || &self.user_id == author
    }
}

/// Persisted chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub content: MessageContent,
    pub author_id: UserId,
    pub author_name: String,
    pub created_at: Timestamp,
    pub is_breaking_news: bool,
}

/// Figures for one product line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProductConfig {
    /// ARR at `updated_at`
    pub arr: f64,
    /// Annual growth rate (0.30 = 30%)
    pub growth_rate: f64,
    /// ARR change over the last month
    pub month_growth: f64,
    /// Unix milliseconds of the last sync
    pub updated_at: i64,
}

/// Background video entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Video {
    pub id: u64,
    pub youtube_id: String,
    pub title: String,
    pub position: u32,
    pub tv_enabled: bool,
}

/// Parameters of a message page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageQuery {
    pub limit: usize,
    /// Only messages strictly older than this instant
    pub before: Option<Timestamp>,
    pub breaking_only: bool,
}

/// One page of messages, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePage {
    pub messages: Vec<ChatMessage>,
    pub has_more: bool,
}
