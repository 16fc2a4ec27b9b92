//! Parsing of chat-mode input lines.

use crate::{domain::content::extract_youtube_id, error::ClientError};

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text: send as a chat message
    Say(String),
    Breaking(String),
    Delete(String),
    Older,
    Arr,
    Who,
    /// Play a video on this dashboard only
    Play(String),
    /// Play a video on every dashboard
    Share(String),
    Start,
    Next,
    Previous,
    Mute(bool),
    ShowVideo(bool),
    Dismiss,
    /// Show the ticker line, optionally pausing or resuming its scroll
    Ticker(Option<bool>),
    Help,
    Quit,
}

impl Command {
    /// Parse one input line
    ///
    /// # Arguments
    ///
    /// * `line` - Raw line as typed
    ///
    /// # Returns
    ///
    /// `None` for blank lines
    pub fn parse(line: &str) -> Result<Option<Self>, ClientError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Command::Say(line.to_string())));
        };

        let (name, argument) = match rest.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, argument.trim()),
            None => (rest, ""),
        };
        let command = match name.to_ascii_lowercase().as_str() {
            "breaking" => Command::Breaking(required(name, argument)?.to_string()),
            "delete" | "del" => Command::Delete(required(name, argument)?.to_string()),
            "older" => Command::Older,
            "arr" => Command::Arr,
            "who" => Command::Who,
            "play" => Command::Play(video_id(name, argument)?),
            "share" => Command::Share(video_id(name, argument)?),
            "start" => Command::Start,
            "next" => Command::Next,
            "prev" | "previous" => Command::Previous,
            "mute" => Command::Mute(true),
            "unmute" => Command::Mute(false),
            "video" => match argument {
                "on" | "show" => Command::ShowVideo(true),
                "off" | "hide" => Command::ShowVideo(false),
                _ => {
                    return Err(ClientError::Input(
                        "usage: /video on|off".to_string(),
                    ));
                }
            },
            "dismiss" => Command::Dismiss,
            "ticker" => match argument {
                "" => Command::Ticker(None),
                "pause" => Command::Ticker(Some(true)),
                "resume" => Command::Ticker(Some(false)),
                _ => {
                    return Err(ClientError::Input(
                        "usage: /ticker [pause|resume]".to_string(),
                    ));
                }
            },
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => {
                return Err(ClientError::Input(format!(
                    "unknown command '/{}', type /help",
                    other
                )));
            }
        };
        Ok(Some(command))
    }
}

fn required<'a>(name: &str, argument: &'a str) -> Result<&'a str, ClientError> {
    if argument.is_empty() {
        Err(ClientError::Input(format!("/{} needs an argument", name)))
    } else {
        Ok(argument)
    }
}

fn video_id(name: &str, argument: &str) -> Result<String, ClientError> {
    extract_youtube_id(required(name, argument)?)
        .ok_or_else(|| ClientError::Input(format!("'{}' is not a YouTube video", argument)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_a_message() {
        // テスト項目: スラッシュで始まらない入力はメッセージになる
        // given (前提条件):
        let line = "  hello team  ";

        // when (操作):
        let command = Command::parse(line).unwrap();

        // then (期待する結果):
        assert_eq!(command, Some(Command::Say("hello team".to_string())));
    }

    #[test]
    fn test_blank_line_is_ignored() {
        // テスト項目: 空行は何もしない
        // given (前提条件):
        let line = "   ";

        // when (操作):
        let command = Command::parse(line).unwrap();

        // then (期待する結果):
        assert_eq!(command, None);
    }

    #[test]
    fn test_commands_with_arguments() {
        // テスト項目: 引数付きコマンドを解釈できる
        // given (前提条件):
        let lines = [
            "/breaking We hit 100M!",
            "/delete 42",
            "/play https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "/share dQw4w9WgXcQ",
            "/video off",
            "/unmute",
            "/ticker pause",
            "/ticker",
        ];

        // when (操作):
        let commands: Vec<Command> = lines
            .iter()
            .map(|line| Command::parse(line).unwrap().unwrap())
            .collect();

        // then (期待する結果):
        assert_eq!(
            commands,
            vec![
                Command::Breaking("We hit 100M!".to_string()),
                Command::Delete("42".to_string()),
                Command::Play("dQw4w9WgXcQ".to_string()),
                Command::Share("dQw4w9WgXcQ".to_string()),
                Command::ShowVideo(false),
                Command::Mute(false),
                Command::Ticker(Some(true)),
                Command::Ticker(None),
            ]
        );
    }

    #[test]
    fn test_invalid_input_is_rejected() {
        // テスト項目: 引数不足・不正な動画・未知のコマンドはエラーになる
        // given (前提条件):
        let lines = ["/delete", "/play https://example.com", "/dance"];

        // when (操作):
        let results: Vec<_> = lines.iter().map(|line| Command::parse(line)).collect();

        // then (期待する結果):
        assert!(results
            .iter()
            .all(|result| matches!(result, Err(ClientError::Input(_)))));
    }
}
