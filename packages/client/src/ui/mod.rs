//! Terminal front end.

pub mod command;
pub mod formatter;
pub mod terminal;

pub use command::Command;
pub use formatter::DashboardFormatter;
pub use terminal::{PrintLog, redisplay_prompt, render_tv, run_chat, run_tv};
