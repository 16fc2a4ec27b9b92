//! Shared ticking clock.
//!
//! One store per process. The first subscription starts a background driver
//! that polls the injected [`Clock`] and notifies every subscriber when the
//! wall-clock second changes. Dropping the last subscription stops it.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use arrboard_shared::time::Clock;
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::{domain::Timestamp, error::contain_panic};

/// Clock listener, called with the snapshot time
pub type ClockListener = Arc<dyn Fn(Timestamp) + Send + Sync>;

/// Default driver polling cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Default)]
struct StoreState {
    listeners: BTreeMap<u64, ClockListener>,
    next_id: u64,
    snapshot: Timestamp,
    driver: Option<JoinHandle<()>>,
}

struct StoreShared {
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    state: Mutex<StoreState>,
}

impl StoreShared {
    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advance the snapshot (never backwards) and notify every listener
    fn tick(&self, now: Timestamp) {
        let (snapshot, listeners): (Timestamp, Vec<ClockListener>) = {
            let mut state = self.state();
            state.snapshot = state.snapshot.max(now);
            (state.snapshot, state.listeners.values().cloned().collect())
        };
        for listener in listeners {
            contain_panic("Clock listener", || listener(snapshot));
        }
    }

    fn unsubscribe(&self, id: u64) {
        let driver = {
            let mut state = self.state();
            state.listeners.remove(&id);
            if state.listeners.is_empty() {
                state.driver.take()
            } else {
                None
            }
        };
        if let Some(driver) = driver {
            driver.abort();
            tracing::debug!("Clock driver stopped");
        }
    }
}

impl Drop for StoreShared {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(driver) = state.driver.take() {
            driver.abort();
        }
    }
}

/// Process-wide clock store; clones share one driver and snapshot
#[derive(Clone)]
pub struct ClockStore {
    shared: Arc<StoreShared>,
}

impl ClockStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_poll_interval(clock, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(clock: Arc<dyn Clock>, poll_interval: Duration) -> Self {
        Self {
            shared: Arc::new(StoreShared {
                clock,
                poll_interval,
                state: Mutex::new(StoreState::default()),
            }),
        }
    }

    /// Register `listener`; keep the returned subscription alive to stay subscribed
    ///
    /// Must be called within a tokio runtime.
    pub fn subscribe<F>(&self, listener: F) -> ClockSubscription
    where
        F: Fn(Timestamp) + Send + Sync + 'static,
    {
        let listener: ClockListener = Arc::new(listener);
        let mut state = self.shared.state();
        state.next_id += 1;
        let id = state.next_id;
        state.listeners.insert(id, listener);

        if state.driver.is_none() {
            let now = self.shared.clock.now_millis();
            state.snapshot = state.snapshot.max(now);
            state.driver = Some(tokio::spawn(drive(
                Arc::downgrade(&self.shared),
                self.shared.poll_interval,
            )));
            tracing::debug!("Clock driver started");
        }

        ClockSubscription {
            shared: self.shared.clone(),
            id: Some(id),
        }
    }

    /// Latest snapshot; reads the clock directly before the first tick
    pub fn current_time(&self) -> Timestamp {
        match self.shared.state().snapshot {
            0 => self.shared.clock.now_millis(),
            snapshot => snapshot,
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.state().driver.is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.state().listeners.len()
    }
}

/// Live registration in a [`ClockStore`]; unsubscribes on drop
pub struct ClockSubscription {
    shared: Arc<StoreShared>,
    id: Option<u64>,
}

impl ClockSubscription {
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.shared.unsubscribe(id);
        }
    }
}

impl Drop for ClockSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

async fn drive(shared: Weak<StoreShared>, poll_interval: Duration) {
    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_second = None;

    loop {
        interval.tick().await;
        let Some(shared) = shared.upgrade() else {
            break;
        };
        let now = shared.clock.now_millis();
        let second = now.div_euclid(1_000);
        if last_second == Some(second) {
            continue;
        }
        last_second = Some(second);
        shared.tick(now);
    }
}
