//! Composition root: builds every feature around one clock store, one
//! realtime client and one signal bus, and routes signals between them.

use std::{
    sync::{Arc, Mutex, PoisonError, Weak},
    time::Duration,
};

use arrboard_server::infrastructure::dto::realtime::channel;
use arrboard_shared::time::Clock;
use tokio::{
    sync::broadcast::error::RecvError,
    task::JoinHandle,
    time::MissedTickBehavior,
};

use crate::{
    config::DashboardConfig,
    domain::{
        AlertSound, AppSignal, BreakingNewsTakeover, ConfigGateway, Identity, MessageGateway,
        PlaybackHost, PlayerFactory, Preferences, PreferencesGateway, VideoGateway,
    },
    infrastructure::realtime::LazyRealtime,
};

use super::{
    arr_board::ArrBoard,
    clock_store::ClockStore,
    feed_controller::{FeedController, FeedKind},
    news_ticker::NewsTicker,
    presence::PresenceTracker,
    signal_bus::SignalBus,
    takeover_runner::TakeoverRunner,
    video_controller::VideoController,
};

/// External collaborators of a dashboard
pub struct DashboardDeps {
    pub messages: Arc<dyn MessageGateway>,
    pub config: Arc<dyn ConfigGateway>,
    pub preferences: Arc<dyn PreferencesGateway>,
    pub videos: Arc<dyn VideoGateway>,
    pub players: Arc<dyn PlayerFactory>,
    pub sound: Arc<dyn AlertSound>,
    pub clock: Arc<dyn Clock>,
}

pub struct Dashboard {
    config: DashboardConfig,
    identity: Identity,
    realtime: LazyRealtime,
    preferences: Arc<dyn PreferencesGateway>,
    signals: SignalBus,
    chat: Arc<FeedController>,
    breaking: Arc<FeedController>,
    ticker: NewsTicker,
    presence: Mutex<Option<PresenceTracker>>,
    board: Arc<ArrBoard>,
    video: Arc<VideoController>,
    takeover: TakeoverRunner,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Dashboard {
    pub fn new(
        config: DashboardConfig,
        identity: Identity,
        realtime: LazyRealtime,
        deps: DashboardDeps,
    ) -> Arc<Self> {
        let signals = SignalBus::new();
        let clock = ClockStore::new(deps.clock);

        let chat = Arc::new(FeedController::new(
            deps.messages.clone(),
            identity.clone(),
            signals.clone(),
            config.page_size,
            FeedKind::Chat,
        ));
        let breaking = Arc::new(FeedController::new(
            deps.messages,
            identity.clone(),
            signals.clone(),
            config.page_size,
            FeedKind::BreakingOnly,
        ));
        let board = ArrBoard::new(deps.config, clock, signals.clone(), config.config_refresh);
        let video = VideoController::new(
            deps.players,
            deps.videos,
            deps.preferences.clone(),
            &config,
        );
        let host: Arc<dyn PlaybackHost> = video.clone();
        let takeover = TakeoverRunner::new(
            BreakingNewsTakeover::new(config.takeover_speed, deps.sound, host),
            &config,
        );
        let ticker = NewsTicker::new(config.ticker_speed, config.frame_interval());

        Arc::new(Self {
            config,
            identity,
            realtime,
            preferences: deps.preferences,
            signals,
            chat,
            breaking,
            ticker,
            presence: Mutex::new(None),
            board,
            video,
            takeover,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Connect, load everything and start the background drivers
    ///
    /// Individual load failures are logged; the dashboard keeps running
    /// with whatever loaded and the refresh backstops fill in later.
    pub async fn start(self: &Arc<Self>) {
        let client = self.realtime.get();
        self.chat.bind(client.open_channel(channel::CHAT));
        self.breaking.bind(client.open_channel(channel::CHAT));
        self.video.bind(client.open_channel(channel::VIDEOS));
        self.board.bind(client.open_channel(channel::CONFIG));

        let presence = PresenceTracker::new(client.clone());
        presence.init_presence(&self.identity);
        *self
            .presence
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(presence);

        // subscribe before anything can raise a signal
        let signals = self.signals.subscribe();
        self.spawn(route_signals(Arc::downgrade(self), signals));

        if let Err(e) = self.board.load().await {
            tracing::warn!("Failed to load ARR figures: {}", e);
        }
        if let Err(e) = self.chat.load_initial().await {
            tracing::warn!("Failed to load messages: {}", e);
        }
        if let Err(e) = self.breaking.load_initial().await {
            tracing::warn!("Failed to load breaking news: {}", e);
        }

        let preferences = match self.preferences.fetch_preferences().await {
            Ok(preferences) => preferences,
            Err(e) => {
                tracing::warn!("Failed to load preferences, using defaults: {}", e);
                Preferences::default()
            }
        };
        if let Some(speed) = preferences.ticker_speed() {
            self.ticker.set_speed(speed);
        }
        if let Err(e) = self.video.load_with(&preferences).await {
            tracing::warn!("Failed to load videos: {}", e);
        }

        self.board.start();
        self.video.start();
        self.ticker.start(self.breaking.clone());
        self.spawn(refresh_feeds(Arc::downgrade(self), self.config.feed_refresh));

        tracing::info!("Dashboard started for {}", self.identity.user_name);
    }

    /// Stop every driver and leave every channel
    pub fn shutdown(&self) {
        for task in self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            task.abort();
        }
        if let Some(presence) = self
            .presence
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            presence.cleanup_presence();
        }
        self.takeover.dismiss();
        self.ticker.stop();
        self.board.stop();
        self.video.stop();
        self.chat.unbind();
        self.breaking.unbind();
        if self.realtime.is_started() {
            self.realtime.get().close();
        }
        tracing::info!("Dashboard stopped");
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn signals(&self) -> &SignalBus {
        &self.signals
    }

    pub fn chat(&self) -> &Arc<FeedController> {
        &self.chat
    }

    pub fn breaking(&self) -> &Arc<FeedController> {
        &self.breaking
    }

    pub fn ticker(&self) -> &NewsTicker {
        &self.ticker
    }

    pub fn board(&self) -> &Arc<ArrBoard> {
        &self.board
    }

    pub fn video(&self) -> &Arc<VideoController> {
        &self.video
    }

    pub fn takeover(&self) -> &TakeoverRunner {
        &self.takeover
    }

    /// Online user names, empty before `start`
    pub fn online_users(&self) -> std::collections::BTreeSet<String> {
        self.presence
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(PresenceTracker::online_users)
            .unwrap_or_default()
    }

    /// Apply one application signal
    pub fn handle_signal(&self, signal: AppSignal) {
        match signal {
            AppSignal::BreakingNews(message) => {
                self.takeover.trigger(message);
            }
            AppSignal::ClosePanel => self.chat.set_visible(false),
            AppSignal::PlayExternalVideo(video_id) => {
                self.signals.emit(AppSignal::ClosePanel);
                if let Err(e) = self.video.play_now(video_id) {
                    tracing::warn!("Failed to play video: {}", e);
                }
            }
            AppSignal::MilestoneReached(milestone) => {
                tracing::info!("Milestone {} reached", milestone);
            }
        }
    }

    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tokio::spawn(future));
    }
}

async fn route_signals(
    dashboard: Weak<Dashboard>,
    mut signals: tokio::sync::broadcast::Receiver<AppSignal>,
) {
    loop {
        match signals.recv().await {
            Ok(signal) => {
                let Some(dashboard) = dashboard.upgrade() else {
                    break;
                };
                dashboard.handle_signal(signal);
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Signal router lagged; {} signal(s) skipped", skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn refresh_feeds(dashboard: Weak<Dashboard>, period: Duration) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let Some(dashboard) = dashboard.upgrade() else {
            break;
        };
        for feed in [&dashboard.chat, &dashboard.breaking] {
            if let Err(e) = feed.refresh().await {
                tracing::debug!("Feed refresh failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use arrboard_server::infrastructure::dto::{
        http::MessageDto,
        realtime::{ServerFrame, event},
    };
    use arrboard_shared::time::ManualClock;

    use super::*;
    use crate::{
        domain::{
            ChatMessage, MessagePage, PlayerState, Video,
            gateway::{
                MockConfigGateway, MockMessageGateway, MockPreferencesGateway, MockVideoGateway,
            },
        },
        infrastructure::{NoSound, RealtimeClient, SimulatedPlayerFactory},
    };

    fn deps() -> DashboardDeps {
        let mut messages = MockMessageGateway::new();
        messages
            .expect_list_messages()
            .returning(|_| Ok(MessagePage::default()));
        let mut config = MockConfigGateway::new();
        config.expect_fetch_config().returning(|| Ok(BTreeMap::new()));
        let mut preferences = MockPreferencesGateway::new();
        preferences
            .expect_fetch_preferences()
            .returning(|| Ok(Preferences::default()));
        preferences
            .expect_patch_preferences()
            .returning(|patch| Ok(Preferences::new(patch)));
        let mut videos = MockVideoGateway::new();
        videos.expect_list_videos().returning(|_| {
            Ok(vec![Video {
                id: 1,
                youtube_id: "aaaaaaaaaaa".to_string(),
                title: "Loop".to_string(),
                position: 0,
            }])
        });
        DashboardDeps {
            messages: Arc::new(messages),
            config: Arc::new(config),
            preferences: Arc::new(preferences),
            videos: Arc::new(videos),
            players: Arc::new(SimulatedPlayerFactory::new(true, 600.0)),
            sound: Arc::new(NoSound),
            clock: Arc::new(ManualClock::new(1_700_000_000_000)),
        }
    }

    fn breaking_frame() -> ServerFrame {
        let message = ChatMessage {
            id: "b1".to_string(),
            content: "We just closed our Series B".to_string(),
            author_id: "admin".to_string(),
            author_name: "Admin".to_string(),
            created_at: 1_700_000_000_000,
            is_breaking_news: true,
        };
        ServerFrame::Broadcast {
            channel: channel::CHAT.to_string(),
            event: event::NEW_MESSAGE.to_string(),
            payload: serde_json::to_value(MessageDto::from(&message)).unwrap(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_breaking_broadcast_takes_over_and_pauses_video() {
        // テスト項目: 速報の受信でテイクオーバーが表示され、背景動画が一時停止する
        // given (前提条件):
        let (client, _rx) = RealtimeClient::detached();
        let dashboard = Dashboard::new(
            DashboardConfig::default(),
            Identity::new("u1", "Alice"),
            LazyRealtime::with_client(client.clone()),
            deps(),
        );
        dashboard.start().await;

        // when (操作):
        client.dispatch(breaking_frame());
        tokio::time::sleep(Duration::from_millis(50)).await;

        // then (期待する結果):
        assert!(dashboard.takeover().is_active());
        assert_eq!(
            dashboard.video().state().player_state,
            Some(PlayerState::Paused)
        );
        assert_eq!(dashboard.chat().messages().len(), 1);
        assert_eq!(dashboard.breaking().messages().len(), 1);

        dashboard.takeover().dismiss();
        assert_eq!(
            dashboard.video().state().player_state,
            Some(PlayerState::Playing)
        );
        dashboard.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_external_video_closes_panel_and_plays() {
        // テスト項目: 外部動画の再生シグナルでパネルが閉じ、その動画が再生される
        // given (前提条件):
        let (client, _rx) = RealtimeClient::detached();
        let dashboard = Dashboard::new(
            DashboardConfig::default(),
            Identity::new("u1", "Alice"),
            LazyRealtime::with_client(client),
            deps(),
        );
        dashboard.start().await;
        dashboard.chat().set_visible(true);

        // when (操作):
        dashboard
            .signals()
            .emit(AppSignal::PlayExternalVideo("dQw4w9WgXcQ".to_string()));
        tokio::time::sleep(Duration::from_millis(50)).await;

        // then (期待する結果):
        assert_eq!(
            dashboard.video().state().playlist,
            vec!["dQw4w9WgXcQ".to_string()]
        );
        dashboard.chat().on_broadcast_insert(ChatMessage {
            id: "m1".to_string(),
            content: "hidden panel".to_string(),
            author_id: "u2".to_string(),
            author_name: "Bob".to_string(),
            created_at: 1,
            is_breaking_news: false,
        });
        assert_eq!(dashboard.chat().unread(), 1);
        dashboard.shutdown();
    }
}
