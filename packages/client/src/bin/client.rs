//! arrboard terminal dashboard.
//!
//! Connects to an arrboard server and shows the live ARR board, the chat
//! feed, the news ticker and breaking-news takeovers in the terminal.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin arrboard-client -- --user-id alice --user-name Alice
//! cargo run --bin arrboard-client -- -u tv-lobby --tv --bell
//! ```

use std::{sync::Arc, time::Duration};

use arrboard_client::{
    config::DashboardConfig,
    domain::{AlertSound, Identity},
    infrastructure::{
        HttpGateway, LazyRealtime, NoSound, SimulatedPlayerFactory, TerminalBell, realtime_url,
    },
    ui::{run_chat, run_tv},
    usecase::{Dashboard, DashboardDeps},
};
use arrboard_shared::{logger::setup_logger, time::SystemClock};
use clap::Parser;

/// Simulated length of every playlist video
const VIDEO_DURATION_SECS: f64 = 180.0;

#[derive(Parser, Debug)]
#[command(name = "arrboard-client")]
#[command(about = "Terminal dashboard with live ARR, chat and breaking news", long_about = None)]
struct Args {
    /// Server origin
    #[arg(short = 's', long, default_value = "http://127.0.0.1:8080")]
    server: String,

    /// User id sent with every request
    #[arg(short = 'u', long)]
    user_id: String,

    /// Display name (defaults to the user id)
    #[arg(short = 'n', long)]
    user_name: Option<String>,

    /// Allow deleting other users' messages locally (the server decides)
    #[arg(long)]
    admin: bool,

    /// Unattended display: redraw the board and auto-dismiss takeovers
    #[arg(long)]
    tv: bool,

    /// Ring the terminal bell on breaking news
    #[arg(long)]
    bell: bool,

    /// Simulate a player whose autoplay is blocked
    #[arg(long)]
    block_autoplay: bool,

    /// Screen width used for the ticker and takeover banner
    #[arg(long, default_value = "80")]
    columns: usize,

    /// TV-mode redraw interval in milliseconds
    #[arg(long, default_value = "200")]
    redraw_ms: u64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing (quieter in TV mode, the screen is redrawn)
    setup_logger(env!("CARGO_BIN_NAME"), if args.tv { "warn" } else { "info" });

    let user_name = args.user_name.clone().unwrap_or_else(|| args.user_id.clone());
    let mut identity = Identity::new(args.user_id.clone(), user_name);
    if args.admin {
        identity = identity.admin();
    }

    // 1. Gateways and adapters
    let gateway = Arc::new(HttpGateway::new(args.server.clone(), identity.clone()));
    let sound: Arc<dyn AlertSound> = if args.bell {
        Arc::new(TerminalBell { enabled: true })
    } else {
        Arc::new(NoSound)
    };
    let deps = DashboardDeps {
        messages: gateway.clone(),
        config: gateway.clone(),
        preferences: gateway.clone(),
        videos: gateway,
        players: Arc::new(SimulatedPlayerFactory::new(
            !args.block_autoplay,
            VIDEO_DURATION_SECS,
        )),
        sound,
        clock: Arc::new(SystemClock),
    };

    // 2. Engine
    let config = DashboardConfig {
        tv_mode: args.tv,
        ..DashboardConfig::default()
    };
    let realtime = LazyRealtime::new(realtime_url(&args.server));
    let dashboard = Dashboard::new(config, identity, realtime, deps);
    dashboard.start().await;

    // 3. Front end
    let result = if args.tv {
        run_tv(
            dashboard.clone(),
            args.columns,
            Duration::from_millis(args.redraw_ms.max(16)),
        )
        .await
    } else {
        run_chat(dashboard.clone()).await
    };

    dashboard.shutdown();
    if let Err(e) = result {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
