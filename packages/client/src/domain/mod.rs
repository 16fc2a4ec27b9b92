//! Domain layer: engine state machines and the backend gateway interfaces.
//!
//! Everything here is synchronous and free of I/O; the usecase layer drives
//! it from timers, frame loops and realtime events.

pub mod content;
pub mod feed;
pub mod flip;
pub mod gateway;
pub mod milestone;
pub mod model;
pub mod projector;
pub mod takeover;
pub mod ticker;
pub mod video;

pub use feed::{FeedPhase, MessageFeed, ScrollAnchor};
pub use flip::{FlipCell, FlipDisplay};
pub use gateway::{
    ConfigGateway, MessageGateway, MessagePage, PageRequest, PreferencesGateway, VideoGateway,
};
pub use milestone::MilestoneTracker;
pub use model::{
    AppSignal, ChatMessage, Identity, Preferences, ProductMetric, TickerItem, Timestamp, Video,
};
pub use projector::{format_currency, project, project_total};
pub use takeover::{AlertSound, BreakingNewsTakeover, PlaybackHost};
pub use ticker::{CharMeasure, Measure, TickerEngine};
pub use video::{Checkpoint, PlayerFactory, PlayerState, VideoPlayer, VideoSession};
