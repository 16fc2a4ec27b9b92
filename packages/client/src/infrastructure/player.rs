//! Simulated embeddable player.
//!
//! Stands in for a real video SDK in the terminal front end and in tests.
//! Position advances with tokio time while playing.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::time::Instant;

use crate::{
    domain::{PlayerFactory, PlayerState, VideoPlayer},
    error::VideoError,
};

#[derive(Debug)]
struct SimState {
    playlist: Vec<String>,
    index: usize,
    state: PlayerState,
    position: f64,
    resumed_at: Option<Instant>,
    muted: bool,
    duration: f64,
}

impl SimState {
    fn current_time(&self) -> f64 {
        let running = self
            .resumed_at
            .map(|at| at.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        (self.position + running).min(self.duration)
    }

    fn settle(&mut self) {
        self.position = self.current_time();
        self.resumed_at = match self.state {
            PlayerState::Playing => Some(Instant::now()),
            _ => None,
        };
    }
}

/// Inspection handle onto a simulated player
#[derive(Debug, Clone)]
pub struct SimulatedPlayer {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedPlayer {
    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_muted(&self) -> bool {
        self.lock().muted
    }

    pub fn current_video(&self) -> Option<String> {
        let state = self.lock();
        state.playlist.get(state.index).cloned()
    }
}

impl VideoPlayer for SimulatedPlayer {
    fn seek_to(&mut self, seconds: f64) {
        let mut state = self.lock();
        state.position = seconds.clamp(0.0, state.duration);
        state.resumed_at = (state.state == PlayerState::Playing).then(Instant::now);
    }

    fn current_time(&self) -> f64 {
        self.lock().current_time()
    }

    fn duration(&self) -> f64 {
        self.lock().duration
    }

    fn player_state(&self) -> PlayerState {
        let state = self.lock();
        if state.state == PlayerState::Playing && state.current_time() >= state.duration {
            return PlayerState::Ended;
        }
        state.state
    }

    fn play_video(&mut self) {
        let mut state = self.lock();
        if state.state != PlayerState::Playing {
            state.settle();
            state.state = PlayerState::Playing;
            state.resumed_at = Some(Instant::now());
        }
    }

    fn pause_video(&mut self) {
        let mut state = self.lock();
        state.settle();
        state.state = PlayerState::Paused;
        state.resumed_at = None;
    }

    fn playlist(&self) -> Vec<String> {
        self.lock().playlist.clone()
    }

    fn playlist_index(&self) -> usize {
        self.lock().index
    }

    fn play_video_at(&mut self, index: usize) {
        let mut state = self.lock();
        if index >= state.playlist.len() {
            return;
        }
        state.index = index;
        state.position = 0.0;
        state.state = PlayerState::Playing;
        state.resumed_at = Some(Instant::now());
    }

    fn mute(&mut self) {
        self.lock().muted = true;
    }

    fn unmute(&mut self) {
        self.lock().muted = false;
    }
}

/// Builds simulated players
///
/// With `autoplay` off, players stay unstarted until `play_video`, which is
/// how a browser that blocks autoplay behaves.
pub struct SimulatedPlayerFactory {
    autoplay: bool,
    duration: f64,
    created: Mutex<Vec<SimulatedPlayer>>,
}

impl SimulatedPlayerFactory {
    pub fn new(autoplay: bool, duration_secs: f64) -> Self {
        Self {
            autoplay,
            duration: duration_secs,
            created: Mutex::new(Vec::new()),
        }
    }

    /// Most recently created player
    pub fn latest(&self) -> Option<SimulatedPlayer> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn created_count(&self) -> usize {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl PlayerFactory for SimulatedPlayerFactory {
    fn create(
        &self,
        playlist: &[String],
        start_index: usize,
        muted: bool,
    ) -> Result<Box<dyn VideoPlayer>, VideoError> {
        if playlist.is_empty() {
            return Err(VideoError::Player("empty playlist".to_string()));
        }
        let (state, resumed_at) = if self.autoplay {
            (PlayerState::Playing, Some(Instant::now()))
        } else {
            (PlayerState::Unstarted, None)
        };
        let player = SimulatedPlayer {
            state: Arc::new(Mutex::new(SimState {
                playlist: playlist.to_vec(),
                index: start_index.min(playlist.len() - 1),
                state,
                position: 0.0,
                resumed_at,
                muted,
                duration: self.duration,
            })),
        };
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(player.clone());
        Ok(Box::new(player))
    }
}
