//! InMemory Dashboard Repository 実装
//!
//! Implements the domain's `DashboardRepository` with plain collections
//! behind a tokio mutex. Messages are kept ascending by `created_at`.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::domain::{
    ChatMessage, DashboardRepository, MessageId, MessagePage, MessageQuery, ProductConfig,
    RepositoryError, UserId, Video,
};

#[derive(Default)]
struct Store {
    messages: Vec<ChatMessage>,
    config: BTreeMap<String, ProductConfig>,
    preferences: HashMap<UserId, Map<String, Value>>,
    videos: Vec<Video>,
}

/// インメモリ Dashboard Repository 実装
#[derive(Default)]
pub struct InMemoryDashboardRepository {
    store: Mutex<Store>,
}

impl InMemoryDashboardRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository seeded with product figures and videos
    pub fn seeded(config: BTreeMap<String, ProductConfig>, videos: Vec<Video>) -> Self {
        let mut videos = videos;
        videos.sort_by_key(|v| v.position);
        Self {
            store: Mutex::new(Store {
                config,
                videos,
                ..Store::default()
            }),
        }
    }
}

#[async_trait]
impl DashboardRepository for InMemoryDashboardRepository {
    async fn insert_message(&self, message: ChatMessage) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().await;
        let position = store
            .messages
            .partition_point(|m| m.created_at <= message.created_at);
        store.messages.insert(position, message);
        Ok(())
    }

    async fn find_message(&self, id: &MessageId) -> Result<Option<ChatMessage>, RepositoryError> {
        let store = self.store.lock().await;
        Ok(store.messages.iter().find(|m| &m.id == id).cloned())
    }

    async fn delete_message(&self, id: &MessageId) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().await;
        let before = store.messages.len();
        store.messages.retain(|m| &m.id != id);
        if store.messages.len() == before {
            return Err(RepositoryError::MessageNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_messages(&self, query: MessageQuery) -> Result<MessagePage, RepositoryError> {
        let store = self.store.lock().await;
        let mut matching = store
            .messages
            .iter()
            .rev()
            .filter(|m| query.before.is_none_or(|before| m.created_at < before))
            .filter(|m| !query.breaking_only || m.is_breaking_news);

        let messages: Vec<ChatMessage> = matching.by_ref().take(query.limit).cloned().collect();
        let has_more = matching.next().is_some();

        Ok(MessagePage { messages, has_more })
    }

    async fn get_config(&self) -> Result<Vec<(String, ProductConfig)>, RepositoryError> {
        let store = self.store.lock().await;
        Ok(store
            .config
            .iter()
            .map(|(name, config)| (name.clone(), *config))
            .collect())
    }

    async fn put_config(
        &self,
        product: String,
        config: ProductConfig,
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.lock().await;
        store.config.insert(product, config);
        Ok(())
    }

    async fn get_preferences(&self, user_id: &UserId) -> Result<Map<String, Value>, RepositoryError> {
        let store = self.store.lock().await;
        Ok(store.preferences.get(user_id).cloned().unwrap_or_default())
    }

    async fn merge_preferences(
        &self,
        user_id: &UserId,
        patch: Map<String, Value>,
    ) -> Result<Map<String, Value>, RepositoryError> {
        let mut store = self.store.lock().await;
        let entry = store.preferences.entry(user_id.clone()).or_default();
        for (key, value) in patch {
            entry.insert(key, value);
        }
        Ok(entry.clone())
    }

    async fn list_videos(&self, tv_only: bool) -> Result<Vec<Video>, RepositoryError> {
        let store = self.store.lock().await;
        Ok(store
            .videos
            .iter()
            .filter(|v| !tv_only || v.tv_enabled)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageContent, Timestamp};
    use serde_json::json;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - メッセージのページング（新しい順、before、breaking フィルタ、has_more）
    // - 削除と存在確認
    // - プリファレンスのシャローマージ
    // - 動画の並び順と TV フィルタ
    // ========================================

    fn message(author: &str, content: &str, created_at: i64, breaking: bool) -> ChatMessage {
        ChatMessage {
            id: MessageId::generate(),
            content: MessageContent::new(content.to_string()).unwrap(),
            author_id: UserId::new(author.to_string()).unwrap(),
            author_name: author.to_string(),
            created_at: Timestamp::new(created_at),
            is_breaking_news: breaking,
        }
    }

    async fn repository_with_messages(count: i64) -> InMemoryDashboardRepository {
        let repo = InMemoryDashboardRepository::new();
        for i in 1..=count {
            repo.insert_message(message("alice", &format!("m{}", i), i * 1000, i % 2 == 0))
                .await
                .unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn test_list_messages_newest_first_with_has_more() {
        // テスト項目: 最新のメッセージから limit 件返し、残りがあれば has_more が立つ
        // given (前提条件):
        let repo = repository_with_messages(5).await;

        // when (操作):
        let page = repo
            .list_messages(MessageQuery {
                limit: 3,
                before: None,
                breaking_only: false,
            })
            .await
            .unwrap();

        // then (期待する結果):
        let contents: Vec<&str> = page.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m5", "m4", "m3"]);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn test_list_messages_before_is_strict() {
        // テスト項目: before は指定時刻より厳密に古いメッセージのみ返す
        // given (前提条件):
        let repo = repository_with_messages(5).await;

        // when (操作):
        let page = repo
            .list_messages(MessageQuery {
                limit: 10,
                before: Some(Timestamp::new(3000)),
                breaking_only: false,
            })
            .await
            .unwrap();

        // then (期待する結果):
        let contents: Vec<&str> = page.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m1"]);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn test_list_messages_breaking_only() {
        // テスト項目: breaking フィルタで速報メッセージのみ返す
        // given (前提条件):
        let repo = repository_with_messages(5).await;

        // when (操作):
        let page = repo
            .list_messages(MessageQuery {
                limit: 10,
                before: None,
                breaking_only: true,
            })
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(page.messages.len(), 2);
        assert!(page.messages.iter().all(|m| m.is_breaking_news));
    }

    #[tokio::test]
    async fn test_delete_message_not_found() {
        // テスト項目: 存在しないメッセージの削除は MessageNotFound を返す
        // given (前提条件):
        let repo = repository_with_messages(1).await;
        let unknown = MessageId::generate();

        // when (操作):
        let result = repo.delete_message(&unknown).await;

        // then (期待する結果):
        assert!(matches!(result, Err(RepositoryError::MessageNotFound(_))));
    }

    #[tokio::test]
    async fn test_merge_preferences_is_shallow() {
        // テスト項目: プリファレンスはキー単位で上書きマージされる
        // given (前提条件):
        let repo = InMemoryDashboardRepository::new();
        let user = UserId::new("alice".to_string()).unwrap();
        let first = json!({"muted": true, "tickerSpeed": 60});
        repo.merge_preferences(&user, first.as_object().unwrap().clone())
            .await
            .unwrap();

        // when (操作):
        let second = json!({"tickerSpeed": 90});
        let merged = repo
            .merge_preferences(&user, second.as_object().unwrap().clone())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(merged.get("muted"), Some(&json!(true)));
        assert_eq!(merged.get("tickerSpeed"), Some(&json!(90)));
    }

    #[tokio::test]
    async fn test_list_videos_ordered_and_filtered() {
        // テスト項目: 動画は position 順で返り、tv_only で絞り込める
        // given (前提条件):
        let videos = vec![
            Video {
                id: 2,
                youtube_id: "bbbbbbbbbbb".to_string(),
                title: "second".to_string(),
                position: 1,
                tv_enabled: false,
            },
            Video {
                id: 1,
                youtube_id: "aaaaaaaaaaa".to_string(),
                title: "first".to_string(),
                position: 0,
                tv_enabled: true,
            },
        ];
        let repo = InMemoryDashboardRepository::seeded(BTreeMap::new(), videos);

        // when (操作):
        let all = repo.list_videos(false).await.unwrap();
        let tv = repo.list_videos(true).await.unwrap();

        // then (期待する結果):
        assert_eq!(all[0].title, "first");
        assert_eq!(all[1].title, "second");
        assert_eq!(tv.len(), 1);
    }
}
