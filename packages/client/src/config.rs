//! Engine tunables.

use std::time::Duration;

/// Default ticker scroll speed (px/s)
pub const DEFAULT_TICKER_SPEED: f64 = 60.0;
/// Default takeover scroll speed (px/s)
pub const DEFAULT_TAKEOVER_SPEED: f64 = 80.0;
/// Default chat page size
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Dashboard engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    /// News ticker speed in px/s
    pub ticker_speed: f64,
    /// Breaking-news takeover speed in px/s
    pub takeover_speed: f64,
    /// Takeover auto-dismiss delay (TV mode only)
    pub auto_dismiss: Duration,
    /// Interval between video progress checkpoints
    pub checkpoint_interval: Duration,
    /// Delay after player creation before checking for blocked autoplay
    pub autoplay_check_delay: Duration,
    pub page_size: usize,
    pub frame_rate: u32,
    /// Backstop config refetch interval
    pub config_refresh: Duration,
    /// Backstop feed refetch interval
    pub feed_refresh: Duration,
    /// Unattended display mode (auto-dismiss takeovers, no input)
    pub tv_mode: bool,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            ticker_speed: DEFAULT_TICKER_SPEED,
            takeover_speed: DEFAULT_TAKEOVER_SPEED,
            auto_dismiss: Duration::from_secs(30),
            checkpoint_interval: Duration::from_secs(10),
            autoplay_check_delay: Duration::from_secs(3),
            page_size: DEFAULT_PAGE_SIZE,
            frame_rate: 60,
            config_refresh: Duration::from_secs(300),
            feed_refresh: Duration::from_secs(60),
            tv_mode: false,
        }
    }
}

impl DashboardConfig {
    /// Time between two animation frames
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate.max(1)))
    }
}
