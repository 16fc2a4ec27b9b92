//! Local chat feed state.
//!
//! REST history and broadcast pushes merge into one ascending,
//! id-deduplicated sequence regardless of arrival order. Deleted ids are
//! tombstoned so a late insert of a deleted message is ignored.

use std::collections::HashSet;

use super::{
    gateway::MessagePage,
    model::{ChatMessage, TickerItem, Timestamp},
};

/// Lifecycle of the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    /// Initial page not loaded yet
    Empty,
    Loaded,
    /// A message send is in flight
    Appending,
    /// An older page is being fetched
    Prepending,
}

/// Ordered, deduplicated chat log
#[derive(Debug, Clone)]
pub struct MessageFeed {
    messages: Vec<ChatMessage>,
    ids: HashSet<String>,
    tombstones: HashSet<String>,
    phase: FeedPhase,
    has_more: bool,
    visible: bool,
    unread: usize,
}

impl Default for MessageFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageFeed {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            ids: HashSet::new(),
            tombstones: HashSet::new(),
            phase: FeedPhase::Empty,
            has_more: false,
            visible: true,
            unread: 0,
        }
    }

    pub fn phase(&self) -> FeedPhase {
        self.phase
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Messages in ascending `created_at` order
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn find(&self, id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn oldest_created_at(&self) -> Option<Timestamp> {
        self.messages.first().map(|m| m.created_at)
    }

    pub fn unread(&self) -> usize {
        self.unread
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Showing the panel clears the unread count
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        if visible {
            self.unread = 0;
        }
    }

    /// Merge the initial (newest-first) page
    pub fn apply_initial(&mut self, page: MessagePage) -> usize {
        let added = self.merge(page.messages);
        self.has_more = page.has_more;
        self.phase = FeedPhase::Loaded;
        added
    }

    /// Enter `Prepending`; false when a fetch is running or nothing is left
    pub fn begin_prepend(&mut self) -> bool {
        if self.phase != FeedPhase::Loaded || !self.has_more {
            return false;
        }
        self.phase = FeedPhase::Prepending;
        true
    }

    /// Merge an older page in front and return to `Loaded`
    pub fn finish_prepend(&mut self, page: MessagePage) -> usize {
        let added = self.merge(page.messages);
        self.has_more = page.has_more;
        self.phase = FeedPhase::Loaded;
        added
    }

    pub fn begin_append(&mut self) {
        if self.phase == FeedPhase::Loaded {
            self.phase = FeedPhase::Appending;
        }
    }

    /// Leave a transient phase after its request settled (either way)
    pub fn settle(&mut self) {
        if matches!(self.phase, FeedPhase::Appending | FeedPhase::Prepending) {
            self.phase = FeedPhase::Loaded;
        }
    }

    /// Insert a live message; false for a known or deleted id
    pub fn insert(&mut self, message: ChatMessage) -> bool {
        if !self.insert_sorted(message) {
            return false;
        }
        if !self.visible {
            self.unread += 1;
        }
        true
    }

    /// Remove and tombstone `id`; true when a message was removed
    pub fn remove(&mut self, id: &str) -> bool {
        self.tombstones.insert(id.to_string());
        if !self.ids.remove(id) {
            return false;
        }
        self.messages.retain(|m| m.id != id);
        true
    }

    /// Merge a freshly fetched latest page (insert only)
    pub fn merge_latest(&mut self, page: MessagePage) -> usize {
        self.merge(page.messages)
    }

    /// Projection for the scrolling ticker, oldest first
    pub fn ticker_items(&self) -> Vec<TickerItem> {
        self.messages.iter().map(TickerItem::from).collect()
    }

    fn merge(&mut self, messages: Vec<ChatMessage>) -> usize {
        messages
            .into_iter()
            .filter(|message| !message.id.is_empty())
            .map(|message| self.insert_sorted(message))
            .filter(|inserted| *inserted)
            .count()
    }

    fn insert_sorted(&mut self, message: ChatMessage) -> bool {
        if self.ids.contains(&message.id) || self.tombstones.contains(&message.id) {
            return false;
        }
        let position = self
            .messages
            .partition_point(|m| m.sort_key() < message.sort_key());
        self.ids.insert(message.id.clone());
        self.messages.insert(position, message);
        true
    }
}

/// Keeps the visible content still while older messages are prepended
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAnchor {
    scroll_top: f64,
    scroll_height: f64,
}

impl ScrollAnchor {
    pub fn capture(scroll_top: f64, scroll_height: f64) -> Self {
        Self {
            scroll_top,
            scroll_height,
        }
    }

    /// Scroll offset to apply once the taller content is laid out
    pub fn restore(&self, new_scroll_height: f64) -> f64 {
        self.scroll_top + (new_scroll_height - self.scroll_height)
    }
}
