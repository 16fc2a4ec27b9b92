//! Terminal front end: interactive chat mode and unattended TV mode.

use std::{
    collections::HashSet,
    io::Write,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use arrboard_shared::time::now_millis;
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::{broadcast::error::RecvError, mpsc};

use crate::{
    domain::{AppSignal, ChatMessage, Identity, Timestamp, milestone::MILESTONE_STEP},
    error::ClientError,
    usecase::Dashboard,
};

use super::{command::Command, formatter::DashboardFormatter};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";
/// Width of the ticker line printed in chat mode
const TICKER_COLUMNS: usize = 72;

/// Redisplay the prompt after printing asynchronous output
pub fn redisplay_prompt(user_name: &str) {
    print!("{}> ", user_name);
    std::io::stdout().flush().ok();
}

/// Which chat messages have already been printed
#[derive(Debug, Default)]
pub struct PrintLog {
    newest: Option<(Timestamp, String)>,
    printed: HashSet<String>,
}

impl PrintLog {
    /// Messages newer than anything printed so far, plus ids that vanished
    ///
    /// Older pages never show up here; they are printed explicitly and
    /// recorded with [`PrintLog::mark`].
    pub fn take_changes(
        &mut self,
        messages: &[ChatMessage],
    ) -> (Vec<ChatMessage>, Vec<String>) {
        let present: HashSet<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        let mut deleted: Vec<String> = self
            .printed
            .iter()
            .filter(|id| !present.contains(id.as_str()))
            .cloned()
            .collect();
        deleted.sort();
        for id in &deleted {
            self.printed.remove(id);
        }

        let fresh: Vec<ChatMessage> = messages
            .iter()
            .filter(|message| !self.printed.contains(&message.id))
            .filter(|message| match &self.newest {
                Some((at, id)) => message.sort_key() > (*at, id.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        self.mark(&fresh);
        (fresh, deleted)
    }

    pub fn mark(&mut self, messages: &[ChatMessage]) {
        for message in messages {
            self.printed.insert(message.id.clone());
            let newer = match &self.newest {
                Some((at, id)) => message.sort_key() > (*at, id.as_str()),
                None => true,
            };
            if newer {
                self.newest = Some((message.created_at, message.id.clone()));
            }
        }
    }
}

/// Run the interactive chat mode until the user quits
pub async fn run_chat(dashboard: Arc<Dashboard>) -> Result<(), ClientError> {
    let identity = dashboard.identity().clone();
    dashboard.chat().set_visible(true);

    println!(
        "\nYou are '{}'. Type messages and press Enter to send. /help lists commands.\n",
        identity.user_name
    );
    if let Some(frame) = dashboard.board().latest() {
        print!("{}", DashboardFormatter::format_board(&frame));
    }
    println!(
        "{}",
        DashboardFormatter::format_online(&dashboard.online_users(), &identity)
    );

    let log = Arc::new(Mutex::new(PrintLog::default()));
    let now = now_millis();
    let initial = dashboard.chat().messages();
    for message in &initial {
        println!(
            "{}",
            DashboardFormatter::format_message(message, &identity, now)
        );
    }
    log.lock()
        .unwrap_or_else(PoisonError::into_inner)
        .mark(&initial);

    let feed_task = tokio::spawn(print_feed_changes(
        dashboard.clone(),
        identity.clone(),
        log.clone(),
    ));
    let signal_task = tokio::spawn(print_signals(dashboard.clone(), identity.clone()));

    // Create channel for rustyline input
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();

    // Spawn a blocking thread for rustyline (synchronous readline)
    let prompt = format!("{}> ", identity.user_name);
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.trim()).ok();
                    }
                    if input_tx.send(line).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    while let Some(line) = input_rx.recv().await {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        if let Some(output) = execute(&dashboard, &identity, &log, command).await {
            println!("{}", output);
        }
    }

    feed_task.abort();
    signal_task.abort();
    Ok(())
}

async fn execute(
    dashboard: &Arc<Dashboard>,
    identity: &Identity,
    log: &Mutex<PrintLog>,
    command: Command,
) -> Option<String> {
    match command {
        Command::Say(text) => send(dashboard, &text, false).await,
        Command::Breaking(text) => send(dashboard, &text, true).await,
        Command::Delete(id) => dashboard.chat().delete(&id).await.err().map(|e| e.to_string()),
        Command::Older => {
            let before: HashSet<String> =
                dashboard.chat().messages().into_iter().map(|m| m.id).collect();
            if let Err(e) = dashboard.chat().load_older().await {
                return Some(format!("Failed to load older messages: {}", e));
            }
            let older: Vec<ChatMessage> = dashboard
                .chat()
                .messages()
                .into_iter()
                .filter(|m| !before.contains(&m.id))
                .collect();
            if older.is_empty() {
                return Some("No older messages".to_string());
            }
            log.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .mark(&older);
            Some(DashboardFormatter::format_history(&older, identity, now_millis()))
        }
        Command::Arr => Some(match dashboard.board().latest() {
            Some(frame) => DashboardFormatter::format_board(&frame),
            None => "ARR board is still loading".to_string(),
        }),
        Command::Who => Some(DashboardFormatter::format_online(
            &dashboard.online_users(),
            identity,
        )),
        Command::Play(video_id) => {
            dashboard
                .signals()
                .emit(AppSignal::PlayExternalVideo(video_id));
            None
        }
        Command::Share(video_id) => {
            if !identity.is_admin {
                return Some("Only admins can play a video on every dashboard".to_string());
            }
            match dashboard.video().play_everywhere(video_id) {
                Ok(()) => Some(DashboardFormatter::format_video(&dashboard.video().state())),
                Err(e) => Some(format!("Failed to play video: {}", e)),
            }
        }
        Command::Start => {
            dashboard.video().user_play();
            Some(DashboardFormatter::format_video(&dashboard.video().state()))
        }
        Command::Next => {
            dashboard.video().next();
            Some(DashboardFormatter::format_video(&dashboard.video().state()))
        }
        Command::Previous => {
            dashboard.video().previous();
            Some(DashboardFormatter::format_video(&dashboard.video().state()))
        }
        Command::Mute(muted) => {
            dashboard.video().set_muted(muted).await;
            Some(DashboardFormatter::format_video(&dashboard.video().state()))
        }
        Command::ShowVideo(visible) => {
            dashboard.video().set_visible(visible).await;
            Some(DashboardFormatter::format_video(&dashboard.video().state()))
        }
        Command::Dismiss => {
            if dashboard.takeover().dismiss() {
                Some("Breaking news dismissed".to_string())
            } else {
                None
            }
        }
        Command::Ticker(paused) => {
            if let Some(paused) = paused {
                dashboard.ticker().set_paused(paused);
            }
            Some(DashboardFormatter::format_ticker_status(
                &dashboard.ticker().view(),
                TICKER_COLUMNS,
            ))
        }
        Command::Help => Some(DashboardFormatter::format_help()),
        Command::Quit => None,
    }
}

async fn send(dashboard: &Dashboard, text: &str, breaking: bool) -> Option<String> {
    match dashboard.chat().send(text, breaking).await {
        Ok(_) => None,
        Err(e) => Some(format!("Failed to send: {}", e)),
    }
}

async fn print_feed_changes(
    dashboard: Arc<Dashboard>,
    identity: Identity,
    log: Arc<Mutex<PrintLog>>,
) {
    let mut changes = dashboard.chat().changes();
    while changes.changed().await.is_ok() {
        let messages = dashboard.chat().messages();
        let (fresh, deleted) = log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take_changes(&messages);
        if fresh.is_empty() && deleted.is_empty() {
            continue;
        }
        let now = now_millis();
        println!();
        for id in &deleted {
            println!("{}", DashboardFormatter::format_deleted(id));
        }
        for message in &fresh {
            println!(
                "{}",
                DashboardFormatter::format_message(message, &identity, now)
            );
        }
        redisplay_prompt(&identity.user_name);
    }
}

async fn print_signals(dashboard: Arc<Dashboard>, identity: Identity) {
    let mut signals = dashboard.signals().subscribe();
    loop {
        let text = match signals.recv().await {
            Ok(AppSignal::BreakingNews(message)) => {
                DashboardFormatter::format_breaking_alert(&message)
            }
            Ok(AppSignal::MilestoneReached(milestone)) => {
                DashboardFormatter::format_milestone(milestone, MILESTONE_STEP)
            }
            Ok(AppSignal::PlayExternalVideo(_)) => {
                // The dashboard switches the video before this line prints
                tokio::task::yield_now().await;
                DashboardFormatter::format_video(&dashboard.video().state())
            }
            Ok(AppSignal::ClosePanel) => continue,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Skipped {} signals", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        println!("\n{}", text);
        redisplay_prompt(&identity.user_name);
    }
}

/// Run the unattended TV mode, redrawing until Ctrl+C
pub async fn run_tv(
    dashboard: Arc<Dashboard>,
    columns: usize,
    refresh: Duration,
) -> Result<(), ClientError> {
    dashboard.chat().set_visible(false);
    let mut interval = tokio::time::interval(refresh);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = interval.tick() => {
                print!("{}{}", CLEAR_SCREEN, render_tv(&dashboard, columns));
                std::io::stdout().flush().ok();
            }
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    tracing::warn!("Failed to listen for Ctrl+C: {}", e);
                }
                break;
            }
        }
    }
    Ok(())
}

/// One full TV-mode screen
pub fn render_tv(dashboard: &Dashboard, columns: usize) -> String {
    let mut screen = String::new();

    if let Some(view) = dashboard.takeover().view() {
        let rule = "!".repeat(columns);
        screen.push_str(&format!("{}\n\nBREAKING NEWS\n\n", rule));
        screen.push_str(&DashboardFormatter::format_takeover(&view, columns));
        screen.push_str(&format!("\n\n{}\n", rule));
        return screen;
    }

    match dashboard.board().latest() {
        Some(frame) => screen.push_str(&DashboardFormatter::format_board(&frame)),
        None => screen.push_str("Loading ARR...\n"),
    }
    screen.push('\n');
    screen.push_str(&DashboardFormatter::format_video(&dashboard.video().state()));
    screen.push('\n');
    screen.push_str(&DashboardFormatter::format_online(
        &dashboard.online_users(),
        dashboard.identity(),
    ));
    let unread = dashboard.chat().unread();
    if unread > 0 {
        screen.push_str(&format!("  |  {} unread", unread));
    }
    screen.push_str("\n\n");
    screen.push_str(&DashboardFormatter::format_ticker(
        &dashboard.ticker().view(),
        columns,
    ));
    screen.push('\n');
    screen
}
