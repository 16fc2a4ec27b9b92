//! Backend gateway interfaces
//!
//! The engine talks to the REST backend only through these traits; the
//! infrastructure layer provides the HTTP implementation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::GatewayError;

use super::model::{ChatMessage, Preferences, ProductMetric, Timestamp, Video};

/// Parameters of one `GET /messages` page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    /// Only messages strictly older than this instant
    pub before: Option<Timestamp>,
    pub breaking_only: bool,
}

/// One page of messages as served (newest first)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePage {
    pub messages: Vec<ChatMessage>,
    pub has_more: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn list_messages(&self, request: PageRequest) -> Result<MessagePage, GatewayError>;

    /// Store a message and return the confirmed copy
    async fn post_message(
        &self,
        content: String,
        is_breaking_news: bool,
    ) -> Result<ChatMessage, GatewayError>;

    async fn delete_message(&self, id: String) -> Result<(), GatewayError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigGateway: Send + Sync {
    /// Product figures keyed by product name
    async fn fetch_config(&self) -> Result<BTreeMap<String, ProductMetric>, GatewayError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreferencesGateway: Send + Sync {
    async fn fetch_preferences(&self) -> Result<Preferences, GatewayError>;

    /// Shallow-merge `patch` into the stored preferences, returning the result
    async fn patch_preferences(
        &self,
        patch: Map<String, Value>,
    ) -> Result<Preferences, GatewayError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoGateway: Send + Sync {
    /// Playlist ordered by position
    async fn list_videos(&self, tv_only: bool) -> Result<Vec<Video>, GatewayError>;
}
