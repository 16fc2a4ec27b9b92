//! UseCase: チャットメッセージの取得・投稿・削除
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ページサイズの既定値と上限
//! - 投稿内容の検証（空、500 文字超過）
//! - 削除権限（作成者または管理者のみ）
//!
//! ### どのような状況を想定しているか
//! - 正常系：投稿と削除
//! - 異常系：権限なしの削除、存在しないメッセージ、ストレージ障害

use std::sync::Arc;

use arrboard_shared::time::Clock;

use crate::domain::{
    ChatMessage, DashboardRepository, Identity, MessageContent, MessageId, MessagePage,
    MessageQuery, Timestamp,
};

use super::error::{DeleteMessageError, PostMessageError, UseCaseError};

/// Page size when the client does not ask for one
pub const DEFAULT_PAGE_SIZE: usize = 50;
/// Largest page a client may request
pub const MAX_PAGE_SIZE: usize = 100;

/// メッセージ一覧取得のユースケース
pub struct ListMessagesUseCase {
    repository: Arc<dyn DashboardRepository>,
}

impl ListMessagesUseCase {
    pub fn new(repository: Arc<dyn DashboardRepository>) -> Self {
        Self { repository }
    }

    /// Fetch a page of messages, newest first
    ///
    /// # Arguments
    ///
    /// * `limit` - Requested page size (defaults to 50, clamped to 1..=100)
    /// * `before` - Only messages strictly older than this instant
    /// * `breaking_only` - Only breaking-news messages
    pub async fn execute(
        &self,
        limit: Option<usize>,
        before: Option<Timestamp>,
        breaking_only: bool,
    ) -> Result<MessagePage, UseCaseError> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let page = self
            .repository
            .list_messages(MessageQuery {
                limit,
                before,
                breaking_only,
            })
            .await?;
        Ok(page)
    }
}

/// メッセージ投稿のユースケース
pub struct PostMessageUseCase {
    repository: Arc<dyn DashboardRepository>,
    clock: Arc<dyn Clock>,
}

impl PostMessageUseCase {
    pub fn new(repository: Arc<dyn DashboardRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repository, clock }
    }

    /// Validate and store a new message authored by `author`
    ///
    /// The server does not broadcast it; the posting client does.
    pub async fn execute(
        &self,
        author: &Identity,
        content: String,
        is_breaking_news: bool,
    ) -> Result<ChatMessage, PostMessageError> {
        let content = MessageContent::new(content)?;

        let message = ChatMessage {
            id: MessageId::generate(),
            content,
            author_id: author.user_id.clone(),
            author_name: author.user_name.clone(),
            created_at: Timestamp::new(self.clock.now_millis()),
            is_breaking_news,
        };

        self.repository.insert_message(message.clone()).await?;
        tracing::debug!(
            "Message {} stored for '{}' (breaking={})",
            message.id,
            author.user_name,
            is_breaking_news
        );

        Ok(message)
    }
}

/// メッセージ削除のユースケース
pub struct DeleteMessageUseCase {
    repository: Arc<dyn DashboardRepository>,
}

impl DeleteMessageUseCase {
    pub fn new(repository: Arc<dyn DashboardRepository>) -> Self {
        Self { repository }
    }

    /// Delete a message if `actor` authored it or is an admin
    pub async fn execute(
        &self,
        actor: &Identity,
        message_id: &str,
    ) -> Result<MessageId, DeleteMessageError> {
        let id = MessageId::parse(message_id).map_err(|_| DeleteMessageError::NotFound)?;

        let message = self
            .repository
            .find_message(&id)
            .await?
            .ok_or(DeleteMessageError::NotFound)?;

        if !actor.can_delete(&message.author_id) {
            return Err(DeleteMessageError::Forbidden);
        }

        self.repository.delete_message(&id).await?;
        tracing::info!("Message {} deleted by '{}'", id, actor.user_name);
        Ok(id)
    }
}
