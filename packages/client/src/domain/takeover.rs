//! Breaking-news takeover state.
//!
//! A takeover owns its own single-item ticker. Every trigger bumps a
//! generation; an auto-dismiss timer armed for an older generation is
//! ignored, so a re-trigger always gets its full display time.

use std::sync::Arc;

use crate::error::AudioError;

use super::{model::ChatMessage, ticker::TickerEngine};

/// One-shot alert played when a takeover starts
pub trait AlertSound: Send + Sync {
    fn play(&self) -> Result<(), AudioError>;
}

/// Host hooks for background playback around a takeover
pub trait PlaybackHost: Send + Sync {
    fn pause_background(&self);
    fn resume_background(&self);
}

/// Text scrolled across the takeover banner
pub fn banner_text(message: &ChatMessage) -> String {
    format!("BREAKING: {} | {}  ///  ", message.content, message.author_name)
}

pub struct BreakingNewsTakeover {
    active: Option<ChatMessage>,
    ticker: TickerEngine<String>,
    generation: u64,
    sound: Arc<dyn AlertSound>,
    host: Arc<dyn PlaybackHost>,
}

impl BreakingNewsTakeover {
    pub fn new(speed: f64, sound: Arc<dyn AlertSound>, host: Arc<dyn PlaybackHost>) -> Self {
        Self {
            active: None,
            ticker: TickerEngine::new(speed),
            generation: 0,
            sound,
            host,
        }
    }

    pub fn active(&self) -> Option<&ChatMessage> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn ticker(&self) -> &TickerEngine<String> {
        &self.ticker
    }

    pub fn ticker_mut(&mut self) -> &mut TickerEngine<String> {
        &mut self.ticker
    }

    /// Show `message`, replacing any active one; returns the new generation
    pub fn trigger(&mut self, message: ChatMessage) -> u64 {
        let was_active = self.active.is_some();

        self.ticker.reset(vec![banner_text(&message)]);
        self.active = Some(message);
        self.generation += 1;

        if let Err(e) = self.sound.play() {
            tracing::warn!("Alert sound failed: {}", e);
        }
        if !was_active {
            self.host.pause_background();
        }

        tracing::info!("Breaking news takeover (generation {})", self.generation);
        self.generation
    }

    /// Clear the active message; false when nothing was shown
    pub fn dismiss(&mut self) -> bool {
        if self.active.take().is_none() {
            return false;
        }
        self.ticker.reset(Vec::new());
        self.host.resume_background();
        true
    }

    /// Auto-dismiss timer for `generation` elapsed
    pub fn expire(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            tracing::debug!(
                "Ignoring stale auto-dismiss (generation {} != {})",
                generation,
                self.generation
            );
            return false;
        }
        self.dismiss()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub(crate) struct RecordingHost {
        pub(crate) events: Mutex<Vec<&'static str>>,
    }

    impl PlaybackHost for RecordingHost {
        fn pause_background(&self) {
            self.events.lock().unwrap().push("pause");
        }

        fn resume_background(&self) {
            self.events.lock().unwrap().push("resume");
        }
    }

    pub(crate) struct FailingSound;

    impl AlertSound for FailingSound {
        fn play(&self) -> Result<(), AudioError> {
            Err(AudioError::Unavailable("no device".to_string()))
        }
    }

    pub(crate) fn breaking(id: &str, content: &str) -> ChatMessage {
        ChatMessage {
            id: id.to_string(),
            content: content.to_string(),
            author_id: "admin".to_string(),
            author_name: "Admin".to_string(),
            created_at: 1_000,
            is_breaking_news: true,
        }
    }

    fn takeover(host: Arc<RecordingHost>) -> BreakingNewsTakeover {
        BreakingNewsTakeover::new(80.0, Arc::new(FailingSound), host)
    }

    #[test]
    fn test_trigger_shows_message_even_if_sound_fails() {
        // テスト項目: 効果音が失敗してもテイクオーバーは表示され、動画が一時停止される
        // given (前提条件):
        let host = Arc::new(RecordingHost::default());
        let mut takeover = takeover(host.clone());

        // when (操作):
        let generation = takeover.trigger(breaking("b1", "Series B closed"));

        // then (期待する結果):
        assert_eq!(generation, 1);
        assert_eq!(takeover.active().map(|m| m.id.as_str()), Some("b1"));
        assert_eq!(takeover.ticker().render_list().len(), 1);
        assert_eq!(*host.events.lock().unwrap(), vec!["pause"]);
    }

    #[test]
    fn test_retrigger_replaces_and_resets_scroll() {
        // テスト項目: 再トリガーで内容が置き換わり、スクロール状態がリセットされる
        // given (前提条件):
        let host = Arc::new(RecordingHost::default());
        let mut takeover = takeover(host.clone());
        takeover.trigger(breaking("b1", "first"));
        takeover.ticker_mut().set_content_width(1_000.0);
        takeover.ticker_mut().advance(2.0);

        // when (操作):
        let generation = takeover.trigger(breaking("b2", "second"));

        // then (期待する結果):
        assert_eq!(generation, 2);
        assert_eq!(takeover.active().map(|m| m.id.as_str()), Some("b2"));
        assert_eq!(takeover.ticker().offset(), 0.0);
        assert!(takeover.ticker().render_list()[0].contains("second"));
        assert_eq!(*host.events.lock().unwrap(), vec!["pause"]);
    }

    #[test]
    fn test_stale_expiry_does_not_dismiss_newer_message() {
        // テスト項目: 古い世代の自動消去は新しいメッセージを消さない
        // given (前提条件):
        let host = Arc::new(RecordingHost::default());
        let mut takeover = takeover(host.clone());
        let old = takeover.trigger(breaking("b1", "first"));
        let new = takeover.trigger(breaking("b2", "second"));

        // when (操作):
        let stale = takeover.expire(old);
        let still_active = takeover.is_active();
        let current = takeover.expire(new);

        // then (期待する結果):
        assert!(!stale);
        assert!(still_active);
        assert!(current);
        assert!(!takeover.is_active());
        assert_eq!(*host.events.lock().unwrap(), vec!["pause", "resume"]);
    }

    #[test]
    fn test_dismiss_when_idle_is_noop() {
        // テスト項目: 非表示時の dismiss は動画再開を呼ばない
        // given (前提条件):
        let host = Arc::new(RecordingHost::default());
        let mut takeover = takeover(host.clone());

        // when (操作):
        let dismissed = takeover.dismiss();

        // then (期待する結果):
        assert!(!dismissed);
        assert!(host.events.lock().unwrap().is_empty());
    }
}
