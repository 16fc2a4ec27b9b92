//! Shared video session.
//!
//! Wraps an embeddable player behind the `VideoPlayer` adapter. The player
//! is only rebuilt when visibility or the playlist identity changes; muting,
//! pausing, navigation and progress updates reuse it.

use std::sync::Arc;

use crate::error::VideoError;

/// Player states as reported by the embeddable player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
}

impl PlayerState {
    /// Map the player API's numeric state code
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(PlayerState::Unstarted),
            0 => Some(PlayerState::Ended),
            1 => Some(PlayerState::Playing),
            2 => Some(PlayerState::Paused),
            3 => Some(PlayerState::Buffering),
            5 => Some(PlayerState::Cued),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            PlayerState::Unstarted => -1,
            PlayerState::Ended => 0,
            PlayerState::Playing => 1,
            PlayerState::Paused => 2,
            PlayerState::Buffering => 3,
            PlayerState::Cued => 5,
        }
    }
}

/// Capability surface of an embedded player
pub trait VideoPlayer: Send {
    fn seek_to(&mut self, seconds: f64);
    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;
    fn player_state(&self) -> PlayerState;
    fn play_video(&mut self);
    fn pause_video(&mut self);
    fn playlist(&self) -> Vec<String>;
    fn playlist_index(&self) -> usize;
    fn play_video_at(&mut self, index: usize);
    fn mute(&mut self);
    fn unmute(&mut self);
}

/// Builds players for a playlist
pub trait PlayerFactory: Send + Sync {
    fn create(
        &self,
        playlist: &[String],
        start_index: usize,
        muted: bool,
    ) -> Result<Box<dyn VideoPlayer>, VideoError>;
}

/// Observable session state
#[derive(Debug, Clone, PartialEq)]
pub struct VideoSessionState {
    pub playlist: Vec<String>,
    pub index: usize,
    pub muted: bool,
    pub progress_seconds: f64,
    pub blocked: bool,
    pub visible: bool,
    pub player_state: Option<PlayerState>,
}

/// Progress worth persisting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Checkpoint {
    pub index: usize,
    pub progress_seconds: f64,
}

pub struct VideoSession {
    factory: Arc<dyn PlayerFactory>,
    player: Option<Box<dyn VideoPlayer>>,
    playlist: Vec<String>,
    index: usize,
    visible: bool,
    muted: bool,
    progress: f64,
    blocked: bool,
    pending_seek: Option<f64>,
    last_state: Option<PlayerState>,
    held_by_host: bool,
    /// A remote "play now" video replaced the regular playlist
    forced: bool,
    creations: u64,
}

impl VideoSession {
    pub fn new(factory: Arc<dyn PlayerFactory>, muted: bool) -> Self {
        Self {
            factory,
            player: None,
            playlist: Vec::new(),
            index: 0,
            visible: false,
            muted,
            progress: 0.0,
            blocked: false,
            pending_seek: None,
            last_state: None,
            held_by_host: false,
            forced: false,
            creations: 0,
        }
    }

    pub fn state(&self) -> VideoSessionState {
        VideoSessionState {
            playlist: self.playlist.clone(),
            index: self.index,
            muted: self.muted,
            progress_seconds: self.progress,
            blocked: self.blocked,
            visible: self.visible,
            player_state: self.player.as_ref().map(|p| p.player_state()),
        }
    }

    pub fn has_player(&self) -> bool {
        self.player.is_some()
    }

    /// Number of players built so far
    pub fn creations(&self) -> u64 {
        self.creations
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn current_video(&self) -> Option<&str> {
        self.playlist.get(self.index).map(String::as_str)
    }

    pub fn set_visible(&mut self, visible: bool) -> Result<(), VideoError> {
        if self.visible == visible {
            return Ok(());
        }
        self.visible = visible;
        self.rebuild()
    }

    /// Replace the playlist; resumes at `index` from `progress_seconds`
    ///
    /// An identical playlist keeps the current player untouched.
    pub fn set_playlist(
        &mut self,
        playlist: Vec<String>,
        index: usize,
        progress_seconds: f64,
    ) -> Result<(), VideoError> {
        if playlist == self.playlist && !self.forced {
            return Ok(());
        }
        self.forced = false;
        self.index = index.min(playlist.len().saturating_sub(1));
        self.playlist = playlist;
        self.progress = progress_seconds.max(0.0);
        self.rebuild()
    }

    /// Remote "play now": a single forced video from the start
    ///
    /// A host hold survives; the new player starts paused until released.
    pub fn play_now(&mut self, video_id: String) -> Result<(), VideoError> {
        self.playlist = vec![video_id];
        self.index = 0;
        self.progress = 0.0;
        self.forced = true;
        self.rebuild()
    }

    /// True while a "play now" video stands in for the regular playlist
    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if let Some(player) = self.player.as_mut() {
            if muted {
                player.mute();
            } else {
                player.unmute();
            }
        }
    }

    /// Seek now when playing, otherwise once on the next `Playing`
    pub fn seek_to(&mut self, seconds: f64) {
        match self.player.as_mut() {
            Some(player) if self.last_state == Some(PlayerState::Playing) => {
                player.seek_to(seconds)
            }
            _ => self.pending_seek = Some(seconds),
        }
    }

    /// Feed a player state change (event or poll)
    pub fn on_state_change(&mut self, state: PlayerState) {
        if self.last_state == Some(state) {
            return;
        }
        self.last_state = Some(state);

        if state != PlayerState::Playing {
            return;
        }
        self.blocked = false;
        let Some(player) = self.player.as_mut() else {
            return;
        };
        if let Some(seconds) = self.pending_seek.take() {
            tracing::debug!("Applying deferred seek to {:.1}s", seconds);
            player.seek_to(seconds);
        }
        let index = player.playlist_index();
        if index != self.index {
            self.index = index;
            self.progress = 0.0;
        }
    }

    /// Read the player's state and dispatch a change, if any
    pub fn poll(&mut self) {
        if let Some(state) = self.player.as_ref().map(|p| p.player_state()) {
            self.on_state_change(state);
        }
    }

    /// Current progress, only while actually playing the regular playlist
    pub fn checkpoint(&mut self) -> Option<Checkpoint> {
        if self.forced {
            return None;
        }
        let player = self.player.as_ref()?;
        if player.player_state() != PlayerState::Playing {
            return None;
        }
        self.progress = player.current_time();
        Some(Checkpoint {
            index: self.index,
            progress_seconds: self.progress,
        })
    }

    /// Mark autoplay as blocked unless the player is playing
    pub fn check_autoplay(&mut self) -> bool {
        if let Some(player) = self.player.as_ref()
            && player.player_state() != PlayerState::Playing
            && !self.held_by_host
        {
            tracing::info!("Autoplay appears blocked");
            self.blocked = true;
        }
        self.blocked
    }

    /// Manual play after a blocked autoplay
    pub fn user_play(&mut self) {
        self.blocked = false;
        if let Some(player) = self.player.as_mut() {
            player.play_video();
        }
    }

    /// Host pause (e.g. breaking news)
    pub fn hold(&mut self) {
        self.held_by_host = true;
        if let Some(player) = self.player.as_mut() {
            player.pause_video();
        }
    }

    /// Undo `hold`
    pub fn release(&mut self) {
        if !self.held_by_host {
            return;
        }
        self.held_by_host = false;
        if let Some(player) = self.player.as_mut() {
            player.play_video();
        }
    }

    pub fn next(&mut self) {
        if self.playlist.is_empty() {
            return;
        }
        self.select((self.index + 1) % self.playlist.len());
    }

    pub fn previous(&mut self) {
        if self.playlist.is_empty() {
            return;
        }
        let len = self.playlist.len();
        self.select((self.index + len - 1) % len);
    }

    /// Jump within the current playlist without rebuilding the player
    pub fn select(&mut self, index: usize) {
        if index >= self.playlist.len() {
            return;
        }
        self.index = index;
        self.progress = 0.0;
        self.pending_seek = None;
        if let Some(player) = self.player.as_mut() {
            player.play_video_at(index);
        }
    }

    fn rebuild(&mut self) -> Result<(), VideoError> {
        self.player = None;
        self.last_state = None;
        self.pending_seek = None;
        self.blocked = false;

        if !self.visible || self.playlist.is_empty() {
            return Ok(());
        }

        let mut player = self
            .factory
            .create(&self.playlist, self.index, self.muted)?;
        if self.held_by_host {
            player.pause_video();
        }
        self.creations += 1;
        if self.progress > 0.0 {
            self.pending_seek = Some(self.progress);
        }
        tracing::debug!(
            "Player created for {} video(s) at index {}",
            self.playlist.len(),
            self.index
        );
        self.player = Some(player);
        Ok(())
    }
}
