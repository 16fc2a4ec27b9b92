//! In-process application signals.

use tokio::sync::broadcast;

use crate::domain::AppSignal;

const SIGNAL_CAPACITY: usize = 64;

/// Typed broadcast bus for [`AppSignal`]s; clones share the bus
#[derive(Debug, Clone)]
pub struct SignalBus {
    sender: broadcast::Sender<AppSignal>,
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(SIGNAL_CAPACITY);
        Self { sender }
    }

    /// Deliver to every current receiver; dropped when nobody listens
    pub fn emit(&self, signal: AppSignal) {
        if let Err(broadcast::error::SendError(signal)) = self.sender.send(signal) {
            tracing::debug!("No receivers for signal {:?}", signal);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppSignal> {
        self.sender.subscribe()
    }
}
