//! Client-side domain model.

use serde_json::{Map, Value};

/// Unix milliseconds (UTC)
pub type Timestamp = i64;

/// The signed-in user acting through this client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub user_name: String,
    pub is_admin: bool,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
            is_admin: false,
        }
    }

    pub fn admin(mut self) -> Self {
        self.is_admin = true;
        self
    }

    /// Authors may delete their own messages; admins may delete any
    pub fn can_delete(&self, message: &ChatMessage) -> bool {
        self.is_admin || message.author_id == self.user_id
    }
}

/// Chat message as held in the local feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub author_name: String,
    pub created_at: Timestamp,
    pub is_breaking_news: bool,
}

impl ChatMessage {
    /// Feed ordering key: `created_at`, ties broken by id
    pub fn sort_key(&self) -> (Timestamp, &str) {
        (self.created_at, self.id.as_str())
    }
}

/// Figures of one product line as last synced from the backend
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProductMetric {
    pub base_value: f64,
    /// Annual growth rate (0.30 = +30% per year)
    pub annual_growth_rate: f64,
    pub month_delta: f64,
    pub last_synced_at: Timestamp,
}

/// Playlist entry of the background video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Video {
    pub id: u64,
    pub youtube_id: String,
    pub title: String,
    pub position: u32,
}

/// Read-only projection of a chat message for the scrolling ticker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerItem {
    pub id: String,
    pub author_name: String,
    pub content: String,
    pub is_breaking_news: bool,
}

impl From<&ChatMessage> for TickerItem {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id.clone(),
            author_name: message.author_name.clone(),
            content: message.content.clone(),
            is_breaking_news: message.is_breaking_news,
        }
    }
}

/// In-process signals exchanged between features
#[derive(Debug, Clone, PartialEq)]
pub enum AppSignal {
    /// A breaking-news message should take over the screen
    BreakingNews(ChatMessage),
    /// Close the chat panel
    ClosePanel,
    /// Play a shared external video now (YouTube id)
    PlayExternalVideo(String),
    /// Total ARR crossed a milestone (in units of the milestone step)
    MilestoneReached(u64),
}

/// Preference keys persisted through `/api/preferences`
pub mod preference_key {
    pub const SHOW_VIDEO: &str = "showVideo";
    pub const MUTED: &str = "muted";
    pub const TICKER_SPEED: &str = "tickerSpeed";
    pub const CURRENT_VIDEO_INDEX: &str = "currentVideoIndex";
    pub const VIDEO_PROGRESS: &str = "videoProgress";
}

/// Typed view over the free-form preference map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Preferences(Map<String, Value>);

impl Preferences {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn show_video(&self) -> bool {
        self.bool_or(preference_key::SHOW_VIDEO, true)
    }

    pub fn muted(&self) -> bool {
        self.bool_or(preference_key::MUTED, true)
    }

    pub fn ticker_speed(&self) -> Option<f64> {
        self.0
            .get(preference_key::TICKER_SPEED)
            .and_then(Value::as_f64)
            .filter(|speed| *speed > 0.0)
    }

    pub fn current_video_index(&self) -> usize {
        self.0
            .get(preference_key::CURRENT_VIDEO_INDEX)
            .and_then(Value::as_u64)
            .map(|index| index as usize)
            .unwrap_or(0)
    }

    pub fn video_progress(&self) -> f64 {
        self.0
            .get(preference_key::VIDEO_PROGRESS)
            .and_then(Value::as_f64)
            .filter(|progress| progress.is_finite() && *progress >= 0.0)
            .unwrap_or(0.0)
    }

    fn bool_or(&self, key: &str, default: bool) -> bool {
        self.0.get(key).and_then(Value::as_bool).unwrap_or(default)
    }
}
