//! Shared background video session.
//!
//! Wraps a [`VideoSession`] with the asynchronous parts: loading the
//! playlist and saved progress, polling the player, periodic progress
//! checkpoints, the blocked-autoplay check and remote `play_now` /
//! `videos_changed` events.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    time::Duration,
};

use arrboard_server::infrastructure::dto::realtime::{PlayNowPayload, event};
use serde_json::{Value, json};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

use crate::{
    config::DashboardConfig,
    domain::{
        PlaybackHost, PlayerFactory, PlayerState, Preferences, PreferencesGateway, VideoGateway,
        VideoSession, model::preference_key, video::VideoSessionState,
    },
    error::{GatewayError, VideoError},
    infrastructure::{conversion::decode_play_now, realtime::ChannelHandle},
};

/// How often the player state is read
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct VideoController {
    session: Mutex<VideoSession>,
    videos: Arc<dyn VideoGateway>,
    preferences: Arc<dyn PreferencesGateway>,
    tv_mode: bool,
    checkpoint_interval: Duration,
    autoplay_check_delay: Duration,
    channel: Mutex<Option<ChannelHandle>>,
    driver: Mutex<Option<JoinHandle<()>>>,
    autoplay_check: Mutex<Option<JoinHandle<()>>>,
}

impl VideoController {
    pub fn new(
        factory: Arc<dyn PlayerFactory>,
        videos: Arc<dyn VideoGateway>,
        preferences: Arc<dyn PreferencesGateway>,
        config: &DashboardConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            session: Mutex::new(VideoSession::new(factory, true)),
            videos,
            preferences,
            tv_mode: config.tv_mode,
            checkpoint_interval: config.checkpoint_interval,
            autoplay_check_delay: config.autoplay_check_delay,
            channel: Mutex::new(None),
            driver: Mutex::new(None),
            autoplay_check: Mutex::new(None),
        })
    }

    /// Load saved preferences and the playlist, creating the player
    pub async fn load(self: &Arc<Self>) -> Result<(), GatewayError> {
        let preferences = match self.preferences.fetch_preferences().await {
            Ok(preferences) => preferences,
            Err(e) => {
                tracing::warn!("Failed to load preferences, using defaults: {}", e);
                Preferences::default()
            }
        };
        self.load_with(&preferences).await
    }

    /// Load the playlist and resume from already fetched preferences
    pub async fn load_with(
        self: &Arc<Self>,
        preferences: &Preferences,
    ) -> Result<(), GatewayError> {
        let playlist = self.fetch_playlist().await?;

        let before = self.creations();
        {
            let mut session = self.session();
            session.set_muted(preferences.muted());
            log_video_error(session.set_playlist(
                playlist,
                preferences.current_video_index(),
                preferences.video_progress(),
            ));
            log_video_error(session.set_visible(preferences.show_video()));
        }
        self.after_change(before);
        Ok(())
    }

    /// Refetch the playlist (remote `videos_changed`)
    pub async fn reload_playlist(self: &Arc<Self>) -> Result<(), GatewayError> {
        let playlist = self.fetch_playlist().await?;
        let before = self.creations();
        log_video_error(self.session().set_playlist(playlist, 0, 0.0));
        self.after_change(before);
        Ok(())
    }

    /// Listen for `play_now` and `videos_changed` on `handle`
    pub fn bind(self: &Arc<Self>, handle: ChannelHandle) {
        let controller = Arc::downgrade(self);
        handle.on(event::PLAY_NOW, move |payload| {
            if let (Some(controller), Some(video_id)) =
                (controller.upgrade(), decode_play_now(payload))
            {
                log_video_error(controller.play_now(video_id));
            }
        });

        let controller = Arc::downgrade(self);
        handle.on(event::VIDEOS_CHANGED, move |_| {
            spawn_reload(controller.clone());
        });
        *self.channel() = Some(handle);
    }

    /// Start polling and checkpointing
    pub fn start(self: &Arc<Self>) {
        let mut driver = self.driver();
        if driver.is_some() {
            return;
        }
        *driver = Some(tokio::spawn(drive(
            Arc::downgrade(self),
            self.checkpoint_interval,
        )));
    }

    pub fn stop(&self) {
        for slot in [&self.driver, &self.autoplay_check] {
            if let Some(task) = slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
                task.abort();
            }
        }
        self.channel().take();
    }

    /// Play a single video from the start, on this dashboard only
    ///
    /// The saved position is reset so the next load starts the regular
    /// playlist from the beginning.
    pub fn play_now(self: &Arc<Self>, video_id: String) -> Result<(), VideoError> {
        let before = self.creations();
        self.session().play_now(video_id.clone())?;
        tracing::info!("Playing {} now", video_id);
        self.after_change(before);
        spawn_save(
            Arc::downgrade(self),
            json!({
                preference_key::CURRENT_VIDEO_INDEX: 0,
                preference_key::VIDEO_PROGRESS: 0,
            }),
        );
        Ok(())
    }

    /// Play a video on every connected dashboard
    pub fn play_everywhere(self: &Arc<Self>, video_id: String) -> Result<(), VideoError> {
        let payload = PlayNowPayload {
            youtube_id: video_id.clone(),
        };
        match (serde_json::to_value(payload), self.channel().as_ref()) {
            (Ok(payload), Some(handle)) => handle.send(event::PLAY_NOW, payload),
            (Err(e), _) => tracing::warn!("Failed to encode play_now payload: {}", e),
            (_, None) => tracing::debug!("Video channel not bound; play_now kept local"),
        }
        self.play_now(video_id)
    }

    pub async fn set_muted(&self, muted: bool) {
        self.session().set_muted(muted);
        self.save(json!({ preference_key::MUTED: muted })).await;
    }

    pub async fn set_visible(self: &Arc<Self>, visible: bool) {
        let before = self.creations();
        log_video_error(self.session().set_visible(visible));
        self.after_change(before);
        self.save(json!({ preference_key::SHOW_VIDEO: visible })).await;
    }

    /// Manual play, e.g. after autoplay was blocked
    pub fn user_play(&self) {
        self.session().user_play();
    }

    pub fn next(&self) {
        self.session().next();
    }

    pub fn previous(&self) {
        self.session().previous();
    }

    pub fn select(&self, index: usize) {
        self.session().select(index);
    }

    pub fn state(&self) -> VideoSessionState {
        self.session().state()
    }

    /// Read the player and advance past finished videos
    pub fn poll(&self) {
        let mut session = self.session();
        session.poll();
        if session.state().player_state == Some(PlayerState::Ended) {
            session.next();
        }
    }

    /// Persist progress if the player is playing
    pub async fn checkpoint(&self) {
        let checkpoint = self.session().checkpoint();
        let Some(checkpoint) = checkpoint else {
            return;
        };
        self.save(json!({
            preference_key::CURRENT_VIDEO_INDEX: checkpoint.index,
            preference_key::VIDEO_PROGRESS: checkpoint.progress_seconds,
        }))
        .await;
    }

    async fn save(&self, patch: Value) {
        let Value::Object(patch) = patch else {
            return;
        };
        if let Err(e) = self.preferences.patch_preferences(patch).await {
            tracing::warn!("Failed to save video preferences: {}", e);
        }
    }

    async fn fetch_playlist(&self) -> Result<Vec<String>, GatewayError> {
        let videos = self.videos.list_videos(self.tv_mode).await?;
        Ok(videos.into_iter().map(|video| video.youtube_id).collect())
    }

    fn creations(&self) -> u64 {
        self.session().creations()
    }

    /// Schedule the autoplay check when a new player was built
    fn after_change(self: &Arc<Self>, creations_before: u64) {
        if self.creations() == creations_before {
            return;
        }
        let controller = Arc::downgrade(self);
        let delay = self.autoplay_check_delay;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(controller) = controller.upgrade() {
                controller.session().check_autoplay();
            }
        });
        let previous = self
            .autoplay_check
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn session(&self) -> MutexGuard<'_, VideoSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn channel(&self) -> MutexGuard<'_, Option<ChannelHandle>> {
        self.channel.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn driver(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.driver.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PlaybackHost for VideoController {
    fn pause_background(&self) {
        self.session().hold();
    }

    fn resume_background(&self) {
        self.session().release();
    }
}

impl Drop for VideoController {
    fn drop(&mut self) {
        for slot in [&mut self.driver, &mut self.autoplay_check] {
            if let Some(task) = slot.get_mut().unwrap_or_else(PoisonError::into_inner).take() {
                task.abort();
            }
        }
    }
}

fn log_video_error(result: Result<(), VideoError>) {
    if let Err(e) = result {
        tracing::warn!("Video player error: {}", e);
    }
}

fn spawn_save(controller: Weak<VideoController>, patch: Value) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        tracing::debug!("Preference save outside a runtime skipped");
        return;
    };
    runtime.spawn(async move {
        if let Some(controller) = controller.upgrade() {
            controller.save(patch).await;
        }
    });
}

fn spawn_reload(controller: Weak<VideoController>) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        tracing::debug!("videos_changed outside a runtime ignored");
        return;
    };
    runtime.spawn(async move {
        let Some(controller) = controller.upgrade() else {
            return;
        };
        if let Err(e) = controller.reload_playlist().await {
            tracing::warn!("Failed to reload playlist: {}", e);
        }
    });
}

async fn drive(controller: Weak<VideoController>, checkpoint_interval: Duration) {
    let mut poll = tokio::time::interval(POLL_INTERVAL);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut checkpoint = tokio::time::interval_at(
        tokio::time::Instant::now() + checkpoint_interval,
        checkpoint_interval,
    );
    checkpoint.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = poll.tick() => {
                let Some(controller) = controller.upgrade() else { break };
                controller.poll();
            }
            _ = checkpoint.tick() => {
                let Some(controller) = controller.upgrade() else { break };
                controller.checkpoint().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use arrboard_server::infrastructure::dto::realtime::{ServerFrame, channel};

    use super::*;
    use crate::{
        domain::{
            Video,
            gateway::{MockPreferencesGateway, MockVideoGateway},
        },
        infrastructure::{RealtimeClient, SimulatedPlayerFactory},
    };

    fn videos() -> Vec<Video> {
        ["aaaaaaaaaaa", "bbbbbbbbbbb"]
            .iter()
            .enumerate()
            .map(|(i, id)| Video {
                id: i as u64 + 1,
                youtube_id: id.to_string(),
                title: format!("Video {}", i + 1),
                position: i as u32,
            })
            .collect()
    }

    fn saved(progress: f64) -> Preferences {
        let saved = json!({
            preference_key::CURRENT_VIDEO_INDEX: 1,
            preference_key::VIDEO_PROGRESS: progress,
        });
        Preferences::new(saved.as_object().cloned().unwrap())
    }

    fn controller(
        factory: Arc<SimulatedPlayerFactory>,
        videos_gateway: MockVideoGateway,
        preferences: MockPreferencesGateway,
    ) -> Arc<VideoController> {
        VideoController::new(
            factory,
            Arc::new(videos_gateway),
            Arc::new(preferences),
            &DashboardConfig::default(),
        )
    }

    fn video_gateway(times: usize) -> MockVideoGateway {
        let mut gateway = MockVideoGateway::new();
        gateway
            .expect_list_videos()
            .times(times)
            .returning(|_| Ok(videos()));
        gateway
    }

    #[tokio::test(start_paused = true)]
    async fn test_saved_progress_is_applied_on_first_play() {
        // テスト項目: 保存済みの再生位置が最初の再生開始時に一度だけ適用される
        // given (前提条件):
        let factory = Arc::new(SimulatedPlayerFactory::new(false, 600.0));
        let mut preferences = MockPreferencesGateway::new();
        preferences
            .expect_fetch_preferences()
            .returning(|| Ok(saved(42.0)));
        preferences
            .expect_patch_preferences()
            .returning(|patch| Ok(Preferences::new(patch)));
        let controller = controller(factory.clone(), video_gateway(1), preferences);
        controller.load().await.unwrap();
        controller.start();

        // when (操作):
        controller.user_play();
        tokio::time::sleep(Duration::from_secs(1)).await;

        // then (期待する結果):
        let player = factory.latest().unwrap();
        let position = crate::domain::VideoPlayer::current_time(&player);
        assert!((42.0..43.5).contains(&position), "position {}", position);
        assert_eq!(player.current_video().as_deref(), Some("bbbbbbbbbbb"));
        assert_eq!(factory.created_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_autoplay_is_detected_and_cleared() {
        // テスト項目: 3 秒後に再生されていなければブロック扱いになり、手動再生で解除される
        // given (前提条件):
        let factory = Arc::new(SimulatedPlayerFactory::new(false, 600.0));
        let mut preferences = MockPreferencesGateway::new();
        preferences
            .expect_fetch_preferences()
            .returning(|| Ok(Preferences::default()));
        let controller = controller(factory, video_gateway(1), preferences);
        controller.load().await.unwrap();

        // when (操作):
        tokio::time::sleep(Duration::from_millis(3_100)).await;
        let blocked = controller.state().blocked;
        controller.user_play();

        // then (期待する結果):
        assert!(blocked);
        assert!(!controller.state().blocked);
    }

    #[tokio::test(start_paused = true)]
    async fn test_checkpoint_saved_only_while_playing() {
        // テスト項目: 再生中のみ 10 秒ごとに進捗が保存される
        // given (前提条件):
        let factory = Arc::new(SimulatedPlayerFactory::new(true, 600.0));
        let mut preferences = MockPreferencesGateway::new();
        preferences
            .expect_fetch_preferences()
            .returning(|| Ok(Preferences::default()));
        preferences
            .expect_patch_preferences()
            .withf(|patch| patch.contains_key(preference_key::VIDEO_PROGRESS))
            .times(1)
            .returning(|patch| Ok(Preferences::new(patch)));
        let controller = controller(factory, video_gateway(1), preferences);
        controller.load().await.unwrap();
        controller.start();

        // when (操作):
        tokio::time::sleep(Duration::from_millis(10_100)).await;
        controller.pause_background();
        tokio::time::sleep(Duration::from_secs(10)).await;

        // then (期待する結果):
        assert_eq!(controller.state().player_state, Some(PlayerState::Paused));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_play_now_replaces_playlist() {
        // テスト項目: play_now の受信で単一動画のプレイリストに置き換わる
        // given (前提条件):
        let factory = Arc::new(SimulatedPlayerFactory::new(true, 600.0));
        let mut preferences = MockPreferencesGateway::new();
        preferences
            .expect_fetch_preferences()
            .returning(|| Ok(saved(42.0)));
        preferences
            .expect_patch_preferences()
            .returning(|patch| Ok(Preferences::new(patch)));
        let controller = controller(factory.clone(), video_gateway(1), preferences);
        controller.load().await.unwrap();
        let (client, _rx) = RealtimeClient::detached();
        controller.bind(client.open_channel(channel::VIDEOS));

        // when (操作):
        client.dispatch(ServerFrame::Broadcast {
            channel: channel::VIDEOS.to_string(),
            event: event::PLAY_NOW.to_string(),
            payload: json!({ "youtubeId": "dQw4w9WgXcQ" }),
        });

        // then (期待する結果):
        let state = controller.state();
        assert_eq!(state.playlist, vec!["dQw4w9WgXcQ".to_string()]);
        assert_eq!(state.progress_seconds, 0.0);
        assert_eq!(factory.created_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_now_resets_saved_position_and_skips_checkpoints() {
        // テスト項目: play_now で保存位置が先頭に戻り、その動画の進捗は保存されない
        // given (前提条件):
        let factory = Arc::new(SimulatedPlayerFactory::new(true, 600.0));
        let patches = Arc::new(Mutex::new(Vec::new()));
        let recorded = patches.clone();
        let mut preferences = MockPreferencesGateway::new();
        preferences
            .expect_fetch_preferences()
            .returning(|| Ok(saved(42.0)));
        preferences.expect_patch_preferences().returning(move |patch| {
            recorded.lock().unwrap().push(Value::Object(patch.clone()));
            Ok(Preferences::new(patch))
        });
        let controller = controller(factory, video_gateway(1), preferences);
        controller.load().await.unwrap();
        controller.start();
        tokio::time::sleep(Duration::from_secs(1)).await;

        // when (操作):
        controller.play_now("ccccccccccc".to_string()).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let after_play_now = patches.lock().unwrap().clone();
        tokio::time::sleep(Duration::from_secs(25)).await;

        // then (期待する結果):
        let reset = json!({
            preference_key::CURRENT_VIDEO_INDEX: 0,
            preference_key::VIDEO_PROGRESS: 0,
        });
        assert_eq!(after_play_now, vec![reset.clone()]);
        assert_eq!(*patches.lock().unwrap(), vec![reset]);
        assert_eq!(controller.state().player_state, Some(PlayerState::Playing));
    }

    #[tokio::test(start_paused = true)]
    async fn test_videos_changed_refetches_playlist() {
        // テスト項目: videos_changed の受信でプレイリストを再取得する
        // given (前提条件):
        let factory = Arc::new(SimulatedPlayerFactory::new(true, 600.0));
        let mut preferences = MockPreferencesGateway::new();
        preferences
            .expect_fetch_preferences()
            .returning(|| Ok(Preferences::default()));
        let controller = controller(factory.clone(), video_gateway(2), preferences);
        controller.load().await.unwrap();
        let (client, _rx) = RealtimeClient::detached();
        controller.bind(client.open_channel(channel::VIDEOS));

        // when (操作):
        client.dispatch(ServerFrame::Broadcast {
            channel: channel::VIDEOS.to_string(),
            event: event::VIDEOS_CHANGED.to_string(),
            payload: json!({}),
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        // then (期待する結果):
        assert_eq!(factory.created_count(), 1);
        assert_eq!(controller.state().playlist.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_pause_and_resume() {
        // テスト項目: ホストからの一時停止と再開がプレイヤーに反映される
        // given (前提条件):
        let factory = Arc::new(SimulatedPlayerFactory::new(true, 600.0));
        let mut preferences = MockPreferencesGateway::new();
        preferences
            .expect_fetch_preferences()
            .returning(|| Ok(Preferences::default()));
        let controller = controller(factory, video_gateway(1), preferences);
        controller.load().await.unwrap();

        // when (操作):
        controller.pause_background();
        let paused = controller.state().player_state;
        controller.resume_background();

        // then (期待する結果):
        assert_eq!(paused, Some(PlayerState::Paused));
        assert_eq!(controller.state().player_state, Some(PlayerState::Playing));
    }
}
