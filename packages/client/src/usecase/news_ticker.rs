//! News ticker driver: feeds breaking-news items into a [`TickerEngine`]
//! and advances it on every animation frame.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::task::JoinHandle;

use crate::domain::{CharMeasure, TickerEngine, TickerItem};

use super::{feed_controller::FeedController, frame_loop::FrameLoop};

/// What the front end draws for the ticker line
#[derive(Debug, Clone, PartialEq)]
pub struct TickerView {
    pub items: Vec<TickerItem>,
    pub offset: f64,
    pub width: f64,
    pub paused: bool,
}

pub struct NewsTicker {
    engine: Arc<Mutex<TickerEngine<TickerItem>>>,
    frame_interval: Duration,
    frames: Mutex<Option<FrameLoop>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl NewsTicker {
    pub fn new(speed: f64, frame_interval: Duration) -> Self {
        Self {
            engine: Arc::new(Mutex::new(TickerEngine::new(speed))),
            frame_interval,
            frames: Mutex::new(None),
            watcher: Mutex::new(None),
        }
    }

    /// Follow `feed` and start scrolling
    ///
    /// Must be called within a tokio runtime.
    pub fn start(&self, feed: Arc<FeedController>) {
        self.set_items(feed.ticker_items());

        let mut changes = feed.changes();
        let engine = self.engine.clone();
        let watcher = tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                lock(&engine).set_content(feed.ticker_items());
            }
        });
        if let Some(previous) = self.slot(&self.watcher).replace(watcher) {
            previous.abort();
        }

        let engine = self.engine.clone();
        let frames = FrameLoop::spawn(self.frame_interval, move |timestamp| {
            let mut engine = lock(&engine);
            if engine.needs_measure() {
                engine.measure_with(&CharMeasure);
            }
            if engine.on_frame(timestamp) {
                engine.measure_with(&CharMeasure);
            }
        });
        *self
            .frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(frames);
    }

    pub fn stop(&self) {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watcher) = self.slot(&self.watcher).take() {
            watcher.abort();
        }
    }

    /// Queue new content; shown at the next wrap
    pub fn set_items(&self, items: Vec<TickerItem>) {
        lock(&self.engine).set_content(items);
    }

    pub fn set_speed(&self, speed: f64) {
        lock(&self.engine).set_speed(speed);
    }

    pub fn set_paused(&self, paused: bool) {
        lock(&self.engine).set_paused(paused);
    }

    pub fn view(&self) -> TickerView {
        let engine = lock(&self.engine);
        TickerView {
            items: engine.render_list().to_vec(),
            offset: engine.offset(),
            width: engine.content_width(),
            paused: engine.is_paused(),
        }
    }

    fn slot<'a>(
        &self,
        slot: &'a Mutex<Option<JoinHandle<()>>>,
    ) -> MutexGuard<'a, Option<JoinHandle<()>>> {
        slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for NewsTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock(engine: &Mutex<TickerEngine<TickerItem>>) -> MutexGuard<'_, TickerEngine<TickerItem>> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use crate::{
        domain::{ChatMessage, Identity, gateway::MockMessageGateway, ticker::ticker_segment},
        usecase::{FeedKind, SignalBus},
    };

    use super::*;

    fn breaking(id: &str, created_at: i64) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            content: format!("headline {}", id),
            author_id: "admin".to_string(),
            author_name: "Admin".to_string(),
            created_at,
            is_breaking_news: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_item_appears_only_after_wrap() {
        // テスト項目: 新しい速報は現在のループが一周するまで表示されない
        // given (前提条件):
        let feed = Arc::new(FeedController::new(
            Arc::new(MockMessageGateway::new()),
            Identity::new("u1", "Alice"),
            SignalBus::new(),
            50,
            FeedKind::BreakingOnly,
        ));
        feed.on_broadcast_insert(breaking("b1", 100));
        let ticker = NewsTicker::new(60.0, Duration::from_millis(16));
        ticker.start(feed.clone());
        tokio::time::sleep(Duration::from_millis(100)).await;
        let width = ticker.view().width;

        // when (操作):
        feed.on_broadcast_insert(breaking("b2", 200));
        tokio::time::sleep(Duration::from_millis(50)).await;
        let before_wrap = ticker.view().items.len();
        let loop_secs = width / 60.0;
        tokio::time::sleep(Duration::from_secs_f64(loop_secs)).await;

        // then (期待する結果):
        assert_eq!(before_wrap, 1);
        let view = ticker.view();
        assert_eq!(view.items.len(), 2);
        let expected: usize = view.items.iter().map(|i| ticker_segment(i).chars().count()).sum();
        assert_eq!(view.width, expected as f64);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_freezes_offset() {
        // テスト項目: 一時停止中はオフセットが進まない
        // given (前提条件):
        let ticker = NewsTicker::new(60.0, Duration::from_millis(16));
        ticker.set_items(vec![TickerItem::from(&breaking("b1", 100))]);
        let feed = Arc::new(FeedController::new(
            Arc::new(MockMessageGateway::new()),
            Identity::new("u1", "Alice"),
            SignalBus::new(),
            50,
            FeedKind::BreakingOnly,
        ));
        feed.on_broadcast_insert(breaking("b1", 100));
        ticker.start(feed);
        tokio::time::sleep(Duration::from_millis(200)).await;

        // when (操作):
        ticker.set_paused(true);
        let frozen = ticker.view().offset;
        tokio::time::sleep(Duration::from_millis(500)).await;

        // then (期待する結果):
        assert!(frozen > 0.0);
        assert_eq!(ticker.view().offset, frozen);
        assert!(ticker.view().paused);
    }
}
