//! Realtime broadcast client: named channels, events and presence.
//!
//! One client per process multiplexes every channel over a single
//! connection. A channel is joined when its first local handle opens and
//! left when the last one closes. `send` is fire-and-forget: the server
//! relays to other connections and sibling handles in this process receive
//! it directly.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
};

use arrboard_server::infrastructure::dto::realtime::{ClientFrame, PresenceState, ServerFrame};
use serde_json::Value;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::error::contain_panic;

use super::connection::{ConnectionStatus, supervise};

/// Broadcast event listener
pub type EventCallback = Arc<dyn Fn(&Value) + Send + Sync>;
/// Presence snapshot listener
pub type SyncCallback = Arc<dyn Fn(&PresenceState) + Send + Sync>;

type HandleId = u64;

#[derive(Default)]
struct HandleEntry {
    listeners: Vec<(String, EventCallback)>,
    sync_listeners: Vec<SyncCallback>,
}

#[derive(Default)]
struct ChannelEntry {
    handles: HashMap<HandleId, HandleEntry>,
    presence: PresenceState,
    /// Last `track` of this process, re-sent after reconnecting
    tracked: Option<(String, Value)>,
}

#[derive(Default)]
struct Registry {
    channels: HashMap<String, ChannelEntry>,
    next_handle: HandleId,
}

pub(super) struct Shared {
    registry: Mutex<Registry>,
    outbound: mpsc::UnboundedSender<ClientFrame>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let supervisor = self
            .supervisor
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = supervisor.take() {
            task.abort();
        }
    }
}

/// Process-wide realtime client; clones share one connection
#[derive(Clone)]
pub struct RealtimeClient {
    shared: Arc<Shared>,
    status: watch::Receiver<ConnectionStatus>,
}

impl RealtimeClient {
    /// Client without a connection; outbound frames land in the returned queue
    pub fn detached() -> (Self, mpsc::UnboundedReceiver<ClientFrame>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let (_, status) = watch::channel(ConnectionStatus::Detached);
        let client = Self {
            shared: Arc::new(Shared {
                registry: Mutex::new(Registry::default()),
                outbound,
                supervisor: Mutex::new(None),
            }),
            status,
        };
        (client, rx)
    }

    /// Connect to `url` (e.g. `ws://127.0.0.1:8080/ws`) in the background
    ///
    /// Must be called within a tokio runtime.
    pub fn connect(url: impl Into<String>) -> Self {
        let (outbound, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(ConnectionStatus::Connecting);
        let shared = Arc::new(Shared {
            registry: Mutex::new(Registry::default()),
            outbound,
            supervisor: Mutex::new(None),
        });

        let task = tokio::spawn(supervise(
            url.into(),
            Arc::downgrade(&shared),
            rx,
            status_tx,
        ));
        *shared
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(task);

        Self { shared, status }
    }

    /// Connection status updates
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Stop the connection; open handles become inert
    pub fn close(&self) {
        let task = self
            .shared
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }

    pub fn open_channel(&self, name: &str) -> ChannelHandle {
        self.open(name, None)
    }

    /// Open a channel on which `track` announces this process under `key`
    pub fn open_presence_channel(&self, name: &str, key: &str) -> ChannelHandle {
        self.open(name, Some(key.to_string()))
    }

    /// Number of channels with at least one open handle
    pub fn channel_count(&self) -> usize {
        self.shared.registry().channels.len()
    }

    pub fn handle_count(&self, channel: &str) -> usize {
        self.shared
            .registry()
            .channels
            .get(channel)
            .map(|entry| entry.handles.len())
            .unwrap_or(0)
    }

    /// Deliver a frame received from the server
    pub fn dispatch(&self, frame: ServerFrame) {
        self.shared.dispatch(frame);
    }

    fn open(&self, name: &str, presence_key: Option<String>) -> ChannelHandle {
        let id = {
            let mut registry = self.shared.registry();
            registry.next_handle += 1;
            let id = registry.next_handle;

            let entry = registry.channels.entry(name.to_string()).or_default();
            let first = entry.handles.is_empty();
            entry.handles.insert(id, HandleEntry::default());
            if first {
                self.shared.send_frame(ClientFrame::Join {
                    channel: name.to_string(),
                });
                tracing::debug!("Joined channel '{}'", name);
            }
            id
        };

        ChannelHandle {
            shared: self.shared.clone(),
            channel: name.to_string(),
            id,
            presence_key,
        }
    }
}

impl Shared {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn send_frame(&self, frame: ClientFrame) {
        if self.outbound.send(frame).is_err() {
            tracing::debug!("Realtime connection closed; frame dropped");
        }
    }

    /// Frames that restore every subscription after reconnecting
    pub(super) fn resubscribe_frames(&self) -> Vec<ClientFrame> {
        let registry = self.registry();
        let mut frames = Vec::new();
        for (name, entry) in registry.channels.iter() {
            frames.push(ClientFrame::Join {
                channel: name.clone(),
            });
            if let Some((key, meta)) = &entry.tracked {
                frames.push(ClientFrame::Track {
                    channel: name.clone(),
                    key: key.clone(),
                    meta: meta.clone(),
                });
            }
        }
        frames
    }

    pub(super) fn dispatch(&self, frame: ServerFrame) {
        match frame {
            ServerFrame::Broadcast {
                channel,
                event,
                payload,
            } => {
                let callbacks = self.event_callbacks(&channel, &event, None);
                for callback in callbacks {
                    contain_panic("Broadcast listener", || callback(&payload));
                }
            }
            ServerFrame::PresenceState { channel, state } => {
                let callbacks: Vec<SyncCallback> = {
                    let mut registry = self.registry();
                    let Some(entry) = registry.channels.get_mut(&channel) else {
                        return;
                    };
                    entry.presence = state.clone();
                    entry
                        .handles
                        .values()
                        .flat_map(|handle| handle.sync_listeners.iter().cloned())
                        .collect()
                };
                for callback in callbacks {
                    contain_panic("Presence listener", || callback(&state));
                }
            }
        }
    }

    /// Listeners of `event` on `channel`, optionally skipping one handle
    fn event_callbacks(
        &self,
        channel: &str,
        event: &str,
        skip: Option<HandleId>,
    ) -> Vec<EventCallback> {
        let registry = self.registry();
        let Some(entry) = registry.channels.get(channel) else {
            return Vec::new();
        };
        entry
            .handles
            .iter()
            .filter(|(id, _)| Some(**id) != skip)
            .flat_map(|(_, handle)| {
                handle
                    .listeners
                    .iter()
                    .filter(|(name, _)| name == event)
                    .map(|(_, callback)| callback.clone())
            })
            .collect()
    }
}

/// One subscriber's view of a channel; closing the last handle leaves it
pub struct ChannelHandle {
    shared: Arc<Shared>,
    channel: String,
    id: HandleId,
    presence_key: Option<String>,
}

impl ChannelHandle {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Listen for `event` on this channel
    pub fn on<F>(&self, event: &str, callback: F)
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let callback: EventCallback = Arc::new(callback);
        let mut registry = self.shared.registry();
        if let Some(handle) = registry
            .channels
            .get_mut(&self.channel)
            .and_then(|entry| entry.handles.get_mut(&self.id))
        {
            handle.listeners.push((event.to_string(), callback));
        }
    }

    /// Listen for full presence snapshots
    pub fn on_sync<F>(&self, callback: F)
    where
        F: Fn(&PresenceState) + Send + Sync + 'static,
    {
        let callback: SyncCallback = Arc::new(callback);
        let mut registry = self.shared.registry();
        if let Some(handle) = registry
            .channels
            .get_mut(&self.channel)
            .and_then(|entry| entry.handles.get_mut(&self.id))
        {
            handle.sync_listeners.push(callback);
        }
    }

    /// Fire-and-forget broadcast to every other subscriber
    pub fn send(&self, event: &str, payload: Value) {
        self.shared.send_frame(ClientFrame::Broadcast {
            channel: self.channel.clone(),
            event: event.to_string(),
            payload: payload.clone(),
        });

        let siblings = self
            .shared
            .event_callbacks(&self.channel, event, Some(self.id));
        for callback in siblings {
            contain_panic("Broadcast listener", || callback(&payload));
        }
    }

    /// Announce this process on a presence channel
    pub fn track(&self, meta: Value) {
        let Some(key) = self.presence_key.clone() else {
            tracing::warn!("track() on non-presence channel '{}' ignored", self.channel);
            return;
        };

        if let Some(entry) = self.shared.registry().channels.get_mut(&self.channel) {
            entry.tracked = Some((key.clone(), meta.clone()));
        }
        self.shared.send_frame(ClientFrame::Track {
            channel: self.channel.clone(),
            key,
            meta,
        });
    }

    /// Latest full presence snapshot
    pub fn presence_state(&self) -> PresenceState {
        self.shared
            .registry()
            .channels
            .get(&self.channel)
            .map(|entry| entry.presence.clone())
            .unwrap_or_default()
    }

    /// Close this handle (same as dropping it)
    pub fn close(self) {}
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        let mut registry = self.shared.registry();
        let Some(entry) = registry.channels.get_mut(&self.channel) else {
            return;
        };
        entry.handles.remove(&self.id);
        if entry.handles.is_empty() {
            registry.channels.remove(&self.channel);
            self.shared.send_frame(ClientFrame::Leave {
                channel: self.channel.clone(),
            });
            tracing::debug!("Left channel '{}'", self.channel);
        }
    }
}

/// Lazily connected process-wide client
pub struct LazyRealtime {
    url: String,
    cell: OnceLock<RealtimeClient>,
}

impl LazyRealtime {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            cell: OnceLock::new(),
        }
    }

    /// Already-built client (tests, embedding)
    pub fn with_client(client: RealtimeClient) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(client);
        Self {
            url: String::new(),
            cell,
        }
    }

    /// The shared client, connecting on first use
    pub fn get(&self) -> &RealtimeClient {
        self.cell.get_or_init(|| {
            tracing::info!("Connecting realtime client to {}", self.url);
            RealtimeClient::connect(self.url.clone())
        })
    }

    pub fn is_started(&self) -> bool {
        self.cell.get().is_some()
    }
}
