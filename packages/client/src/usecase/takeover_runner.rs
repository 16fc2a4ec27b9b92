//! Drives the breaking-news takeover: scroll frames and auto-dismiss.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tokio::task::JoinHandle;

use crate::{
    config::DashboardConfig,
    domain::{BreakingNewsTakeover, CharMeasure, ChatMessage, takeover::banner_text},
};

use super::frame_loop::FrameLoop;

/// What the front end draws while a takeover is shown
#[derive(Debug, Clone, PartialEq)]
pub struct TakeoverView {
    pub message: ChatMessage,
    pub banner: String,
    pub offset: f64,
    pub width: f64,
    pub generation: u64,
}

struct RunnerShared {
    takeover: Mutex<BreakingNewsTakeover>,
    frames: Mutex<Option<FrameLoop>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl RunnerShared {
    fn takeover(&self) -> MutexGuard<'_, BreakingNewsTakeover> {
        self.takeover.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn frames(&self) -> MutexGuard<'_, Option<FrameLoop>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn expire(&self, generation: u64) -> bool {
        let dismissed = self.takeover().expire(generation);
        if dismissed {
            self.timer().take();
            self.frames().take();
            tracing::info!("Breaking news auto-dismissed");
        }
        dismissed
    }
}

impl Drop for RunnerShared {
    fn drop(&mut self) {
        let timer = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = timer.take() {
            timer.abort();
        }
    }
}

pub struct TakeoverRunner {
    shared: Arc<RunnerShared>,
    auto_dismiss: Option<Duration>,
    frame_interval: Duration,
}

impl TakeoverRunner {
    /// Auto-dismiss is armed only in TV mode
    pub fn new(takeover: BreakingNewsTakeover, config: &DashboardConfig) -> Self {
        Self {
            shared: Arc::new(RunnerShared {
                takeover: Mutex::new(takeover),
                frames: Mutex::new(None),
                timer: Mutex::new(None),
            }),
            auto_dismiss: config.tv_mode.then_some(config.auto_dismiss),
            frame_interval: config.frame_interval(),
        }
    }

    /// Show `message`, replacing any active takeover
    ///
    /// Must be called within a tokio runtime.
    pub fn trigger(&self, message: ChatMessage) -> u64 {
        let generation = {
            let mut takeover = self.shared.takeover();
            let generation = takeover.trigger(message);
            takeover.ticker_mut().measure_with(&CharMeasure);
            generation
        };
        self.start_frames();
        if let Some(delay) = self.auto_dismiss {
            self.arm_timer(generation, delay);
        }
        generation
    }

    pub fn dismiss(&self) -> bool {
        if let Some(timer) = self.shared.timer().take() {
            timer.abort();
        }
        self.shared.frames().take();
        self.shared.takeover().dismiss()
    }

    pub fn is_active(&self) -> bool {
        self.shared.takeover().is_active()
    }

    pub fn is_animating(&self) -> bool {
        self.shared.frames().is_some()
    }

    pub fn view(&self) -> Option<TakeoverView> {
        let takeover = self.shared.takeover();
        let message = takeover.active()?.clone();
        Some(TakeoverView {
            banner: banner_text(&message),
            offset: takeover.ticker().offset(),
            width: takeover.ticker().content_width(),
            generation: takeover.generation(),
            message,
        })
    }

    fn start_frames(&self) {
        let mut frames = self.shared.frames();
        if frames.is_some() {
            return;
        }
        let shared = Arc::downgrade(&self.shared);
        *frames = Some(FrameLoop::spawn(self.frame_interval, move |timestamp| {
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let mut takeover = shared.takeover();
            let ticker = takeover.ticker_mut();
            ticker.on_frame(timestamp);
            if ticker.needs_measure() {
                ticker.measure_with(&CharMeasure);
            }
        }));
    }

    fn arm_timer(&self, generation: u64, delay: Duration) {
        let shared = Arc::downgrade(&self.shared);
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = shared.upgrade() {
                shared.expire(generation);
            }
        });
        if let Some(previous) = self.shared.timer().replace(task) {
            previous.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::takeover::tests::{FailingSound, RecordingHost, breaking};

    use super::*;

    fn runner(host: Arc<RecordingHost>, tv_mode: bool) -> TakeoverRunner {
        let config = DashboardConfig {
            tv_mode,
            ..DashboardConfig::default()
        };
        let takeover =
            BreakingNewsTakeover::new(config.takeover_speed, Arc::new(FailingSound), host);
        TakeoverRunner::new(takeover, &config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_retrigger_gets_full_display_time() {
        // テスト項目: 20 秒後の再トリガーは 30 秒時点では消えず、50 秒時点で自動的に消える
        // given (前提条件):
        let host = Arc::new(RecordingHost::default());
        let runner = runner(host.clone(), true);
        runner.trigger(breaking("a", "First"));

        // when (操作):
        tokio::time::sleep(Duration::from_secs(20)).await;
        runner.trigger(breaking("b", "Second"));
        tokio::time::sleep(Duration::from_secs(11)).await;
        let at_31s = runner.view().map(|view| view.message.id);
        tokio::time::sleep(Duration::from_secs(18)).await;
        let at_49s = runner.view().map(|view| view.message.id);
        tokio::time::sleep(Duration::from_secs(2)).await;

        // then (期待する結果):
        assert_eq!(at_31s.as_deref(), Some("b"));
        assert_eq!(at_49s.as_deref(), Some("b"));
        assert!(!runner.is_active());
        assert!(!runner.is_animating());
        assert_eq!(*host.events.lock().unwrap(), vec!["pause", "resume"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_banner_scrolls_while_active() {
        // テスト項目: テイクオーバー中はバナーがスクロールする
        // given (前提条件):
        let runner = runner(Arc::new(RecordingHost::default()), false);

        // when (操作):
        runner.trigger(breaking("a", "A fairly long breaking headline for the banner"));
        tokio::time::sleep(Duration::from_millis(200)).await;

        // then (期待する結果):
        let view = runner.view().unwrap();
        assert!(view.width > 0.0);
        assert!(view.offset > 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_auto_dismiss_outside_tv_mode() {
        // テスト項目: TV モード以外では自動で消えず、手動で閉じると動画が再開される
        // given (前提条件):
        let host = Arc::new(RecordingHost::default());
        let runner = runner(host.clone(), false);
        runner.trigger(breaking("a", "Stays up"));

        // when (操作):
        tokio::time::sleep(Duration::from_secs(60)).await;
        let still_active = runner.is_active();
        let dismissed = runner.dismiss();

        // then (期待する結果):
        assert!(still_active);
        assert!(dismissed);
        assert!(!runner.is_animating());
        assert_eq!(*host.events.lock().unwrap(), vec!["pause", "resume"]);
    }
}
