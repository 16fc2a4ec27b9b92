//! Online-user presence.
//!
//! Presence is keyed by display name, so two sessions of the same name
//! collapse into one entry.

use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use arrboard_server::infrastructure::dto::realtime::{PresenceState, channel};
use serde_json::json;
use tokio::sync::watch;

use crate::{
    domain::Identity,
    infrastructure::realtime::{ChannelHandle, RealtimeClient},
};

/// Meta field carrying the display name
pub const USER_NAME_FIELD: &str = "userName";

/// Names present in a full snapshot; falls back to the key when no meta names one
pub fn online_names(state: &PresenceState) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for (key, metas) in state {
        let mut named = false;
        for name in metas
            .iter()
            .filter_map(|meta| meta.get(USER_NAME_FIELD).and_then(|v| v.as_str()))
        {
            names.insert(name.to_string());
            named = true;
        }
        if !named && !key.is_empty() {
            names.insert(key.clone());
        }
    }
    names
}

pub struct PresenceTracker {
    realtime: RealtimeClient,
    channel: Mutex<Option<ChannelHandle>>,
    online: Arc<watch::Sender<BTreeSet<String>>>,
}

impl PresenceTracker {
    pub fn new(realtime: RealtimeClient) -> Self {
        let (online, _) = watch::channel(BTreeSet::new());
        Self {
            realtime,
            channel: Mutex::new(None),
            online: Arc::new(online),
        }
    }

    /// Join the presence channel and announce `identity`; false if already joined
    pub fn init_presence(&self, identity: &Identity) -> bool {
        let mut slot = self.channel();
        if slot.is_some() {
            return false;
        }

        let handle = self
            .realtime
            .open_presence_channel(channel::PRESENCE, &identity.user_name);
        let online = self.online.clone();
        handle.on_sync(move |state| {
            online.send_replace(online_names(state));
        });
        handle.track(json!({ USER_NAME_FIELD: identity.user_name }));

        let current = handle.presence_state();
        if !current.is_empty() {
            self.online.send_replace(online_names(&current));
        }
        *slot = Some(handle);
        tracing::debug!("Presence tracked as '{}'", identity.user_name);
        true
    }

    /// Leave the presence channel and forget everyone
    pub fn cleanup_presence(&self) {
        if self.channel().take().is_some() {
            self.online.send_replace(BTreeSet::new());
        }
    }

    /// Reactive set of online user names
    pub fn online(&self) -> watch::Receiver<BTreeSet<String>> {
        self.online.subscribe()
    }

    pub fn online_users(&self) -> BTreeSet<String> {
        self.online.borrow().clone()
    }

    fn channel(&self) -> MutexGuard<'_, Option<ChannelHandle>> {
        self.channel.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use arrboard_server::infrastructure::dto::realtime::{ClientFrame, ServerFrame};

    use super::*;

    fn snapshot(entries: &[(&str, &str)]) -> ServerFrame {
        let state = entries
            .iter()
            .map(|(key, name)| (key.to_string(), vec![json!({ USER_NAME_FIELD: name })]))
            .collect();
        ServerFrame::PresenceState {
            channel: channel::PRESENCE.to_string(),
            state,
        }
    }

    #[test]
    fn test_init_presence_is_idempotent() {
        // テスト項目: init_presence を二度呼んでも join/track は一度だけ
        // given (前提条件):
        let (client, mut rx) = RealtimeClient::detached();
        let tracker = PresenceTracker::new(client);
        let identity = Identity::new("u1", "Alice");

        // when (操作):
        let first = tracker.init_presence(&identity);
        let second = tracker.init_presence(&identity);

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        assert_eq!(
            frames,
            vec![
                ClientFrame::Join {
                    channel: channel::PRESENCE.to_string()
                },
                ClientFrame::Track {
                    channel: channel::PRESENCE.to_string(),
                    key: "Alice".to_string(),
                    meta: json!({ "userName": "Alice" }),
                },
            ]
        );
    }

    #[test]
    fn test_set_is_rebuilt_from_each_snapshot() {
        // テスト項目: スナップショットごとにオンライン集合が作り直される
        // given (前提条件):
        let (client, _rx) = RealtimeClient::detached();
        let tracker = PresenceTracker::new(client.clone());
        tracker.init_presence(&Identity::new("u1", "Alice"));
        let online = tracker.online();

        // when (操作):
        client.dispatch(snapshot(&[("Alice", "Alice"), ("Bob", "Bob")]));
        let both = online.borrow().clone();
        client.dispatch(snapshot(&[("Alice", "Alice")]));

        // then (期待する結果):
        assert_eq!(both, BTreeSet::from(["Alice".to_string(), "Bob".to_string()]));
        assert_eq!(tracker.online_users(), BTreeSet::from(["Alice".to_string()]));
    }

    #[test]
    fn test_cleanup_leaves_and_clears() {
        // テスト項目: cleanup_presence でチャンネルを離脱し集合が空になる
        // given (前提条件):
        let (client, mut rx) = RealtimeClient::detached();
        let tracker = PresenceTracker::new(client.clone());
        tracker.init_presence(&Identity::new("u1", "Alice"));
        client.dispatch(snapshot(&[("Alice", "Alice")]));
        while rx.try_recv().is_ok() {}

        // when (操作):
        tracker.cleanup_presence();

        // then (期待する結果):
        assert!(tracker.online_users().is_empty());
        assert_eq!(client.channel_count(), 0);
        assert_eq!(
            rx.try_recv().ok(),
            Some(ClientFrame::Leave {
                channel: channel::PRESENCE.to_string()
            })
        );
    }

    #[test]
    fn test_online_names_falls_back_to_key() {
        // テスト項目: メタに名前がなければキーを名前として使う
        // given (前提条件):
        let state: PresenceState =
            [("Carol".to_string(), vec![json!({})])].into_iter().collect();

        // when (操作):
        let names = online_names(&state);

        // then (期待する結果):
        assert_eq!(names, BTreeSet::from(["Carol".to_string()]));
    }
}
