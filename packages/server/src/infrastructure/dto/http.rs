//! REST request and response bodies (camelCase JSON).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Header carrying the acting user's id
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the acting user's display name
pub const USER_NAME_HEADER: &str = "x-user-name";

/// Figures of one product line
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductConfigDto {
    pub arr: f64,
    pub growth_rate: f64,
    #[serde(default)]
    pub month_growth: f64,
    /// Unix milliseconds
    pub updated_at: i64,
}

/// `GET /api/config` response: product name to figures
pub type ConfigResponse = BTreeMap<String, ProductConfigDto>;

/// Chat message as exchanged over REST and broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: String,
    pub content: String,
    pub user_id: String,
    pub user_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_breaking_news: bool,
}

/// `GET /api/messages` query string
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<usize>,
    pub before: Option<DateTime<Utc>>,
    pub breaking: Option<bool>,
}

/// `GET /api/messages` response (newest first)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesResponse {
    pub messages: Vec<MessageDto>,
    #[serde(default)]
    pub has_more: bool,
}

/// `POST /api/messages` body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    pub content: String,
    #[serde(default)]
    pub is_breaking_news: bool,
}

/// `POST /api/messages` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostMessageResponse {
    pub message: MessageDto,
}

/// `DELETE /api/messages` body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessageRequest {
    pub message_id: String,
}

/// `DELETE /api/messages` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteMessageResponse {
    pub deleted: String,
}

/// Background video entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDto {
    pub id: u64,
    pub youtube_id: String,
    #[serde(default)]
    pub title: String,
    pub position: u32,
    #[serde(default)]
    pub tv_enabled: bool,
}

/// `GET /api/videos` query string
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideosQuery {
    pub tv: Option<u8>,
}

/// `GET /api/videos` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideosResponse {
    pub videos: Vec<VideoDto>,
}

/// Error body returned with non-success statuses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
