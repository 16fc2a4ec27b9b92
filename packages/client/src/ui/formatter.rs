//! Text formatting for the terminal front end.

use std::collections::BTreeSet;

use chrono::{Local, TimeZone};

use crate::{
    domain::{
        ChatMessage, Identity, PlayerState, Timestamp,
        content::{Segment, parse_content, relative_time},
        ticker::ticker_segment,
        video::VideoSessionState,
    },
    usecase::{BoardFrame, BoardLine, TakeoverView, TickerView},
};

const RULE: &str = "============================================================";

/// Formatter for dashboard output
pub struct DashboardFormatter;

impl DashboardFormatter {
    /// Format one chat line
    ///
    /// Links are bracketed and YouTube links are tagged with their video id
    /// so they can be passed to `/play`.
    pub fn format_message(message: &ChatMessage, me: &Identity, now: Timestamp) -> String {
        let body: String = parse_content(&message.content)
            .into_iter()
            .map(|segment| match segment {
                Segment::Text(text) => text,
                Segment::Url(url) => format!("<{}>", url),
                Segment::Youtube { url, video_id } => format!("<{}> [video {}]", url, video_id),
            })
            .collect();
        let me_suffix = if message.author_id == me.user_id {
            " (me)"
        } else {
            ""
        };
        let breaking = if message.is_breaking_news {
            "[BREAKING] "
        } else {
            ""
        };
        format!(
            "[{}] {}@{}{}: {}  #{}",
            relative_time(now, message.created_at),
            breaking,
            message.author_name,
            me_suffix,
            body,
            message.id
        )
    }

    /// Format a page of older messages
    pub fn format_history(messages: &[ChatMessage], me: &Identity, now: Timestamp) -> String {
        let mut output = String::new();
        output.push_str(&format!("--- {} older message(s) ---\n", messages.len()));
        for message in messages {
            output.push_str(&Self::format_message(message, me, now));
            output.push('\n');
        }
        output.push_str("---\n");
        output
    }

    pub fn format_deleted(id: &str) -> String {
        format!("(message #{} deleted)", id)
    }

    /// Format the online user list
    pub fn format_online(users: &BTreeSet<String>, me: &Identity) -> String {
        if users.is_empty() {
            return "Online: (nobody)".to_string();
        }
        let names: Vec<String> = users
            .iter()
            .map(|name| {
                if *name == me.user_name {
                    format!("{} (me)", name)
                } else {
                    name.clone()
                }
            })
            .collect();
        format!("Online ({}): {}", users.len(), names.join(", "))
    }

    /// Format the ARR board
    pub fn format_board(frame: &BoardFrame) -> String {
        let mut output = String::new();
        output.push_str(RULE);
        output.push('\n');
        output.push_str(&format!("ARR  {}\n", Self::format_clock(frame.now)));
        for line in &frame.products {
            output.push_str(&Self::format_line(line));
            output.push('\n');
        }
        output.push_str(&Self::format_line(&frame.total));
        output.push('\n');
        output.push_str(RULE);
        output.push('\n');
        output
    }

    fn format_line(line: &BoardLine) -> String {
        let value = match line.value {
            Some(_) => line.text(),
            None => "loading...".to_string(),
        };
        let delta = line
            .month_delta
            .map(|delta| format!("  ({:+.1}% MoM)", delta * 100.0))
            .unwrap_or_default();
        format!("{:<16}{:>22}{}", line.label, value, delta)
    }

    /// Local wall-clock time of `now`
    pub fn format_clock(now: Timestamp) -> String {
        Local
            .timestamp_millis_opt(now)
            .single()
            .map(|time| time.format("%H:%M:%S").to_string())
            .unwrap_or_default()
    }

    /// Visible window of the news ticker
    pub fn format_ticker(view: &TickerView, columns: usize) -> String {
        let text: String = view.items.iter().map(ticker_segment).collect();
        scroll_window(&text, view.offset, columns)
    }

    /// Ticker window with a marker while its scroll is paused
    pub fn format_ticker_status(view: &TickerView, columns: usize) -> String {
        let marker = if view.paused { "[paused] " } else { "" };
        format!("{}{}", marker, Self::format_ticker(view, columns))
    }

    /// Visible window of the takeover banner
    pub fn format_takeover(view: &TakeoverView, columns: usize) -> String {
        scroll_window(&view.banner, view.offset, columns)
    }

    /// Announcement printed in chat mode when a takeover starts
    pub fn format_breaking_alert(message: &ChatMessage) -> String {
        format!(
            "\n{}\n!!! BREAKING NEWS from {} !!!\n{}\n{}\n",
            RULE, message.author_name, message.content, RULE
        )
    }

    pub fn format_milestone(milestone: u64, step: f64) -> String {
        format!(
            "*** Milestone: total ARR passed ${} ***",
            group_digits(milestone.saturating_mul(step as u64))
        )
    }

    /// Format the background video status
    pub fn format_video(state: &VideoSessionState) -> String {
        if !state.visible {
            return "Video: hidden".to_string();
        }
        let Some(current) = state.playlist.get(state.index) else {
            return "Video: no playlist".to_string();
        };
        if state.blocked {
            return format!("Video: {} blocked by autoplay, type /start", current);
        }
        let status = match state.player_state {
            Some(PlayerState::Playing) => "playing",
            Some(PlayerState::Paused) => "paused",
            Some(PlayerState::Buffering) => "buffering",
            Some(PlayerState::Ended) => "ended",
            _ => "ready",
        };
        format!(
            "Video: {} {} ({}/{}){}",
            status,
            current,
            state.index + 1,
            state.playlist.len(),
            if state.muted { " muted" } else { "" }
        )
    }

    pub fn format_help() -> String {
        [
            "Commands:",
            "  <text>              send a message",
            "  /breaking <text>    send breaking news",
            "  /delete <id>        delete a message",
            "  /older              load older messages",
            "  /arr                show the ARR board",
            "  /who                list online users",
            "  /play <url|id>      play a YouTube video here",
            "  /share <url|id>     play a YouTube video on every dashboard",
            "  /start              start playback after blocked autoplay",
            "  /next, /prev        change video",
            "  /mute, /unmute      toggle video sound",
            "  /video on|off       show or hide the video",
            "  /dismiss            close the breaking-news takeover",
            "  /ticker [pause|resume]  show the news ticker, or stop/start its scroll",
            "  /help               show this help",
            "  /quit               exit",
        ]
        .join("\n")
    }
}

/// `columns` characters of `text` starting at `offset`, wrapping around
pub fn scroll_window(text: &str, offset: f64, columns: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return " ".repeat(columns);
    }
    let start = if offset.is_finite() && offset > 0.0 {
        offset.floor() as usize % chars.len()
    } else {
        0
    };
    chars.iter().cycle().skip(start).take(columns).collect()
}

fn group_digits(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}
