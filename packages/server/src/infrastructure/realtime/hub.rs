//! In-process relay hub for broadcast channels and presence.

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicU64, Ordering},
};

use serde_json::Value;
use tokio::sync::{Mutex, mpsc};

use crate::infrastructure::dto::realtime::{ClientFrame, PresenceState, ServerFrame};

/// Outbound queue of one WebSocket connection
pub type ConnectionChannel = mpsc::UnboundedSender<String>;

/// Hub-assigned connection identifier
pub type ConnectionId = u64;

struct Connection {
    sender: ConnectionChannel,
    channels: HashSet<String>,
    /// channel -> (presence key, meta)
    presence: HashMap<String, (String, Value)>,
}

/// Relay hub shared by every WebSocket connection
pub struct RealtimeHub {
    connections: Mutex<HashMap<ConnectionId, Connection>>,
    next_id: AtomicU64,
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a connection's outbound queue
    pub async fn register(&self, sender: ConnectionChannel) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut connections = self.connections.lock().await;
        connections.insert(
            id,
            Connection {
                sender,
                channels: HashSet::new(),
                presence: HashMap::new(),
            },
        );
        tracing::debug!("Connection {} registered", id);
        id
    }

    /// Drop a connection, leaving every channel it joined
    pub async fn unregister(&self, id: ConnectionId) {
        let mut connections = self.connections.lock().await;
        let Some(connection) = connections.remove(&id) else {
            return;
        };
        tracing::debug!("Connection {} unregistered", id);

        for channel in connection.presence.keys() {
            push_presence_state(&connections, channel);
        }
    }

    /// Apply one frame received from a connection
    pub async fn handle_frame(&self, id: ConnectionId, frame: ClientFrame) {
        match frame {
            ClientFrame::Join { channel } => self.join(id, channel).await,
            ClientFrame::Leave { channel } => self.leave(id, &channel).await,
            ClientFrame::Broadcast {
                channel,
                event,
                payload,
            } => self.broadcast(id, channel, event, payload).await,
            ClientFrame::Track { channel, key, meta } => self.track(id, channel, key, meta).await,
        }
    }

    async fn join(&self, id: ConnectionId, channel: String) {
        let mut connections = self.connections.lock().await;
        let Some(connection) = connections.get_mut(&id) else {
            return;
        };
        connection.channels.insert(channel.clone());

        // a joining member always starts from the full snapshot
        let frame = ServerFrame::PresenceState {
            state: collect_presence(&connections, &channel),
            channel,
        };
        if let Some(connection) = connections.get(&id) {
            send_frame(id, &connection.sender, &frame);
        }
    }

    async fn leave(&self, id: ConnectionId, channel: &str) {
        let mut connections = self.connections.lock().await;
        let Some(connection) = connections.get_mut(&id) else {
            return;
        };
        connection.channels.remove(channel);
        if connection.presence.remove(channel).is_some() {
            push_presence_state(&connections, channel);
        }
    }

    async fn broadcast(&self, from: ConnectionId, channel: String, event: String, payload: Value) {
        let connections = self.connections.lock().await;
        let frame = ServerFrame::Broadcast {
            channel: channel.clone(),
            event,
            payload,
        };

        for (id, connection) in connections.iter() {
            if *id == from || !connection.channels.contains(&channel) {
                continue;
            }
            send_frame(*id, &connection.sender, &frame);
        }
    }

    async fn track(&self, id: ConnectionId, channel: String, key: String, meta: Value) {
        let mut connections = self.connections.lock().await;
        let Some(connection) = connections.get_mut(&id) else {
            return;
        };
        connection.channels.insert(channel.clone());
        connection.presence.insert(channel.clone(), (key, meta));
        push_presence_state(&connections, &channel);
    }

    /// Current presence snapshot of a channel
    pub async fn presence_state(&self, channel: &str) -> PresenceState {
        let connections = self.connections.lock().await;
        collect_presence(&connections, channel)
    }

    /// Number of connections joined to a channel
    pub async fn member_count(&self, channel: &str) -> usize {
        let connections = self.connections.lock().await;
        connections
            .values()
            .filter(|c| c.channels.contains(channel))
            .count()
    }
}

fn collect_presence(connections: &HashMap<ConnectionId, Connection>, channel: &str) -> PresenceState {
    let mut state = PresenceState::new();
    let mut ids: Vec<&ConnectionId> = connections.keys().collect();
    ids.sort();
    for id in ids {
        if let Some((key, meta)) = connections[id].presence.get(channel) {
            state.entry(key.clone()).or_default().push(meta.clone());
        }
    }
    state
}

fn push_presence_state(connections: &HashMap<ConnectionId, Connection>, channel: &str) {
    let frame = ServerFrame::PresenceState {
        channel: channel.to_string(),
        state: collect_presence(connections, channel),
    };
    for (id, connection) in connections.iter() {
        if connection.channels.contains(channel) {
            send_frame(*id, &connection.sender, &frame);
        }
    }
}

fn send_frame(id: ConnectionId, sender: &ConnectionChannel, frame: &ServerFrame) {
    let text = match serde_json::to_string(frame) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!("Failed to serialize frame: {}", e);
            return;
        }
    };
    // 一部の送信失敗は許容する
    if let Err(e) = sender.send(text) {
        tracing::warn!("Failed to push frame to connection {}: {}", id, e);
    }
}
