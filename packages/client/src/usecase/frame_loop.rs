//! Animation-frame driver.

use std::time::Duration;

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use crate::error::contain_panic;

/// Calls a frame callback at a fixed cadence until dropped
///
/// The callback receives milliseconds since the loop started, like a
/// browser animation-frame timestamp.
pub struct FrameLoop {
    task: JoinHandle<()>,
}

impl FrameLoop {
    /// Must be called within a tokio runtime.
    pub fn spawn<F>(interval: Duration, mut on_frame: F) -> Self
    where
        F: FnMut(f64) + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let timestamp = started.elapsed().as_secs_f64() * 1_000.0;
                contain_panic("Frame callback", || on_frame(timestamp));
            }
        });
        Self { task }
    }

    pub fn stop(self) {}
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.task.abort();
    }
}
