//! UseCase layer: asynchronous drivers around the domain state machines.

pub mod arr_board;
pub mod clock_store;
pub mod dashboard;
pub mod feed_controller;
pub mod frame_loop;
pub mod news_ticker;
pub mod presence;
pub mod signal_bus;
pub mod takeover_runner;
pub mod video_controller;

pub use arr_board::{ArrBoard, BoardFrame, BoardLine};
pub use clock_store::{ClockStore, ClockSubscription};
pub use dashboard::{Dashboard, DashboardDeps};
pub use feed_controller::{FeedController, FeedKind};
pub use frame_loop::FrameLoop;
pub use news_ticker::{NewsTicker, TickerView};
pub use presence::PresenceTracker;
pub use signal_bus::SignalBus;
pub use takeover_runner::{TakeoverRunner, TakeoverView};
pub use video_controller::VideoController;
