//! Repository trait 定義
//!
//! The domain layer defines the storage interface it needs; the
//! infrastructure layer provides the implementation.

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{
    ChatMessage, MessageId, MessagePage, MessageQuery, ProductConfig, RepositoryError, UserId,
    Video,
};

/// Dashboard storage interface
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DashboardRepository: Send + Sync {
    /// Store a new message
    async fn insert_message(&self, message: ChatMessage) -> Result<(), RepositoryError>;

    /// Look up a message by id
    async fn find_message(&self, id: &MessageId) -> Result<Option<ChatMessage>, RepositoryError>;

    /// Remove a message; `MessageNotFound` when absent
    async fn delete_message(&self, id: &MessageId) -> Result<(), RepositoryError>;

    /// Fetch a page of messages, newest first
    async fn list_messages(&self, query: MessageQuery) -> Result<MessagePage, RepositoryError>;

    /// All product figures keyed by product name
    async fn get_config(&self) -> Result<Vec<(String, ProductConfig)>, RepositoryError>;

    /// Insert or replace one product's figures
    async fn put_config(
        &self,
        product: String,
        config: ProductConfig,
    ) -> Result<(), RepositoryError>;

    /// Stored preferences of a user (empty object when none)
    async fn get_preferences(&self, user_id: &UserId) -> Result<Map<String, Value>, RepositoryError>;

    /// Shallow-merge `patch` into a user's preferences and return the result
    async fn merge_preferences(
        &self,
        user_id: &UserId,
        patch: Map<String, Value>,
    ) -> Result<Map<String, Value>, RepositoryError>;

    /// Videos ordered by position, optionally only the TV-enabled ones
    async fn list_videos(&self, tv_only: bool) -> Result<Vec<Video>, RepositoryError>;
}
