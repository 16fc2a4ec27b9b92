//! arrboard reference backend.
//!
//! Serves the dashboard REST API and the realtime relay from memory.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin arrboard-server
//! cargo run --bin arrboard-server -- --port 3000 --admin alice --video dQw4w9WgXcQ
//! cargo run --bin arrboard-server -- --config-file products.json
//! ```

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use arrboard_server::{
    domain::{ProductConfig, Video},
    infrastructure::{dto::http::ConfigResponse, repository::InMemoryDashboardRepository},
    ui::{Server, state::AppState},
};
use arrboard_shared::{
    logger::setup_logger,
    time::{SystemClock, now_millis},
};
use clap::Parser;

/// Figures seeded when no config file is given
const DEFAULT_PRODUCT: &str = "lemlist";
const DEFAULT_ARR: f64 = 108_000_000.0;
const DEFAULT_GROWTH_RATE: f64 = 0.30;

#[derive(Parser, Debug)]
#[command(name = "arrboard-server")]
#[command(about = "Dashboard backend with REST API and realtime relay", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// User id allowed to delete any message and edit config (repeatable)
    #[arg(long = "admin")]
    admins: Vec<String>,

    /// JSON file mapping product name to `{arr, growthRate, monthGrowth, updatedAt}`
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// YouTube video id for the playlist, in order (repeatable)
    #[arg(long = "video")]
    videos: Vec<String>,
}

fn load_config(path: Option<&PathBuf>) -> Result<BTreeMap<String, ProductConfig>, String> {
    let Some(path) = path else {
        let mut config = BTreeMap::new();
        config.insert(
            DEFAULT_PRODUCT.to_string(),
            ProductConfig {
                arr: DEFAULT_ARR,
                growth_rate: DEFAULT_GROWTH_RATE,
                month_growth: 0.0,
                updated_at: now_millis(),
            },
        );
        return Ok(config);
    };

    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    let parsed: ConfigResponse = serde_json::from_str(&raw)
        .map_err(|e| format!("failed to parse {}: {}", path.display(), e))?;
    Ok(parsed
        .into_iter()
        .map(|(name, dto)| (name, ProductConfig::from(dto)))
        .collect())
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // 1. Repository (in-memory database)
    let config = match load_config(args.config_file.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Config error: {}", e);
            std::process::exit(1);
        }
    };
    let videos: Vec<Video> = args
        .videos
        .iter()
        .enumerate()
        .map(|(index, youtube_id)| Video {
            id: index as u64 + 1,
            youtube_id: youtube_id.clone(),
            title: format!("Video {}", index + 1),
            position: index as u32,
            tv_enabled: true,
        })
        .collect();
    tracing::info!(
        "Seeded {} product(s) and {} video(s)",
        config.len(),
        videos.len()
    );
    let repository = Arc::new(InMemoryDashboardRepository::seeded(config, videos));

    // 2. UseCases and shared state
    let state = AppState::new(
        repository,
        Arc::new(SystemClock),
        args.admins.into_iter().collect(),
    );

    // 3. Run the server
    let server = Server::new(state);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
