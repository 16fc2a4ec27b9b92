//! Infrastructure layer: REST gateway, realtime transport and device adapters.

pub mod audio;
pub mod conversion;
pub mod http;
pub mod player;
pub mod realtime;

pub use audio::{NoSound, TerminalBell};
pub use http::{HttpGateway, realtime_url};
pub use player::{SimulatedPlayer, SimulatedPlayerFactory};
pub use realtime::{ChannelHandle, ConnectionStatus, LazyRealtime, RealtimeClient};
