//! Message feed controller.
//!
//! Keeps one ordered, id-deduplicated chat log in sync from two sources:
//! REST history pages and live broadcasts on the chat channel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arrboard_server::{
    domain::MessageContent,
    infrastructure::dto::{
        http::MessageDto,
        realtime::{DeleteMessagePayload, event},
    },
};
use serde::Serialize;
use tokio::sync::watch;

use crate::{
    domain::{
        AppSignal, ChatMessage, FeedPhase, Identity, MessageFeed, MessageGateway, PageRequest,
        TickerItem,
    },
    error::{FeedError, GatewayError},
    infrastructure::{
        conversion::{decode_deleted_id, decode_message},
        realtime::ChannelHandle,
    },
};

use super::signal_bus::SignalBus;

/// Which messages a feed keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    /// Full chat log; raises breaking-news signals
    Chat,
    /// Breaking news only, for the ticker
    BreakingOnly,
}

struct FeedShared {
    feed: Mutex<MessageFeed>,
    kind: FeedKind,
    signals: SignalBus,
    revision: watch::Sender<u64>,
}

impl FeedShared {
    fn feed(&self) -> MutexGuard<'_, MessageFeed> {
        self.feed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn changed(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    fn insert(&self, message: ChatMessage) -> bool {
        if self.kind == FeedKind::BreakingOnly && !message.is_breaking_news {
            return false;
        }
        let breaking = message.is_breaking_news.then(|| message.clone());
        if !self.feed().insert(message) {
            return false;
        }
        self.changed();
        if self.kind == FeedKind::Chat
            && let Some(message) = breaking
        {
            self.signals.emit(AppSignal::BreakingNews(message));
        }
        true
    }

    fn remove(&self, id: &str) -> bool {
        let removed = self.feed().remove(id);
        if removed {
            self.changed();
        }
        removed
    }
}

pub struct FeedController {
    gateway: Arc<dyn MessageGateway>,
    identity: Identity,
    page_size: usize,
    shared: Arc<FeedShared>,
    channel: Mutex<Option<ChannelHandle>>,
}

impl FeedController {
    pub fn new(
        gateway: Arc<dyn MessageGateway>,
        identity: Identity,
        signals: SignalBus,
        page_size: usize,
        kind: FeedKind,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            gateway,
            identity,
            page_size: page_size.max(1),
            shared: Arc::new(FeedShared {
                feed: Mutex::new(MessageFeed::new()),
                kind,
                signals,
                revision,
            }),
            channel: Mutex::new(None),
        }
    }

    /// Listen for `new_message` / `delete_message` on `handle`
    pub fn bind(&self, handle: ChannelHandle) {
        let shared = self.shared.clone();
        handle.on(event::NEW_MESSAGE, move |payload| {
            if let Some(message) = decode_message(payload) {
                shared.insert(message);
            }
        });
        let shared = self.shared.clone();
        handle.on(event::DELETE_MESSAGE, move |payload| {
            if let Some(id) = decode_deleted_id(payload) {
                shared.remove(&id);
            }
        });
        *self.channel() = Some(handle);
    }

    /// Drop the channel subscription
    pub fn unbind(&self) {
        self.channel().take();
    }

    /// Fetch the newest page
    pub async fn load_initial(&self) -> Result<usize, GatewayError> {
        let page = self.gateway.list_messages(self.page_request(None)).await?;
        let added = self.shared.feed().apply_initial(page);
        self.shared.changed();
        tracing::debug!("Loaded {} message(s)", added);
        Ok(added)
    }

    /// Fetch the page before the oldest loaded message
    ///
    /// Returns how many messages were prepended; 0 when a fetch is already
    /// running or the history is exhausted.
    pub async fn load_older(&self) -> Result<usize, GatewayError> {
        let before = {
            let mut feed = self.shared.feed();
            let Some(before) = feed.oldest_created_at() else {
                return Ok(0);
            };
            if !feed.begin_prepend() {
                return Ok(0);
            }
            before
        };

        match self
            .gateway
            .list_messages(self.page_request(Some(before)))
            .await
        {
            Ok(page) => {
                let added = self.shared.feed().finish_prepend(page);
                self.shared.changed();
                Ok(added)
            }
            Err(e) => {
                self.shared.feed().settle();
                Err(e)
            }
        }
    }

    /// Live insert from a broadcast; false for duplicates and deleted ids
    pub fn on_broadcast_insert(&self, message: ChatMessage) -> bool {
        self.shared.insert(message)
    }

    /// Live delete from a broadcast; the id stays tombstoned
    pub fn on_broadcast_delete(&self, id: &str) -> bool {
        self.shared.remove(id)
    }

    /// Post a message, show it locally and broadcast it
    pub async fn send(
        &self,
        content: &str,
        is_breaking_news: bool,
    ) -> Result<ChatMessage, FeedError> {
        let content = MessageContent::new(content.to_string())?;

        self.shared.feed().begin_append();
        let posted = self
            .gateway
            .post_message(content.into_string(), is_breaking_news)
            .await;
        self.shared.feed().settle();
        let message = posted?;

        self.shared.insert(message.clone());
        self.broadcast(event::NEW_MESSAGE, &MessageDto::from(&message));
        Ok(message)
    }

    /// Delete a message authored by the current user (or any, for admins)
    pub async fn delete(&self, id: &str) -> Result<(), FeedError> {
        let allowed = self
            .shared
            .feed()
            .find(id)
            .map(|message| self.identity.can_delete(message));
        if allowed == Some(false) {
            return Err(FeedError::Forbidden);
        }

        self.gateway
            .delete_message(id.to_string())
            .await
            .map_err(|e| match e.status() {
                Some(403) => FeedError::Forbidden,
                Some(404) => FeedError::NotFound(id.to_string()),
                _ => FeedError::Gateway(e),
            })?;

        self.shared.remove(id);
        self.broadcast(
            event::DELETE_MESSAGE,
            &DeleteMessagePayload { id: id.to_string() },
        );
        Ok(())
    }

    /// Merge the latest page (insert only)
    pub async fn refresh(&self) -> Result<usize, GatewayError> {
        let page = self.gateway.list_messages(self.page_request(None)).await?;
        let added = self.shared.feed().merge_latest(page);
        if added > 0 {
            tracing::debug!("Feed refresh picked up {} message(s)", added);
            self.shared.changed();
        }
        Ok(added)
    }

    pub fn set_visible(&self, visible: bool) {
        self.shared.feed().set_visible(visible);
        self.shared.changed();
    }

    pub fn unread(&self) -> usize {
        self.shared.feed().unread()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.shared.feed().messages().to_vec()
    }

    pub fn ticker_items(&self) -> Vec<TickerItem> {
        self.shared.feed().ticker_items()
    }

    pub fn phase(&self) -> FeedPhase {
        self.shared.feed().phase()
    }

    pub fn has_more(&self) -> bool {
        self.shared.feed().has_more()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Bumped on every visible change of the feed
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.shared.revision.subscribe()
    }

    fn page_request(&self, before: Option<i64>) -> PageRequest {
        PageRequest {
            limit: self.page_size,
            before,
            breaking_only: self.shared.kind == FeedKind::BreakingOnly,
        }
    }

    fn channel(&self) -> MutexGuard<'_, Option<ChannelHandle>> {
        self.channel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn broadcast<P: Serialize>(&self, event: &str, payload: &P) {
        let payload = match serde_json::to_value(payload) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("Failed to encode {} payload: {}", event, e);
                return;
            }
        };
        match self.channel().as_ref() {
            Some(handle) => handle.send(event, payload),
            None => tracing::debug!("Feed not bound; {} not broadcast", event),
        }
    }
}
