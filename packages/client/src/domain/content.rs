//! Chat content helpers: link segmentation, YouTube ids, relative times.

use std::fmt;

use reqwest::Url;

use super::model::Timestamp;

/// Characters stripped from the end of a detected URL
const TRAILING_PUNCTUATION: &[char] = &[')', '.', ',', ';', ':', '!', '?'];

/// YouTube video id: 11 characters of `[A-Za-z0-9_-]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoId(String);

impl VideoId {
    /// Accept a raw id or a `watch?v=`, `/embed/` or `youtu.be/` URL
    pub fn parse(input: &str) -> Option<Self> {
        extract_youtube_id(input).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_video_id(value: &str) -> bool {
    value.len() == 11
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub fn extract_youtube_id(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if is_video_id(trimmed) {
        return Some(trimmed.to_string());
    }

    let url = Url::parse(trimmed).ok()?;
    let host = url.host_str().unwrap_or_default();

    if host.contains("youtube.com")
        && let Some((_, v)) = url.query_pairs().find(|(key, _)| key == "v")
        && is_video_id(&v)
    {
        return Some(v.into_owned());
    }

    if let Some(position) = url.path().find("/embed/") {
        let rest = &url.path()[position + "/embed/".len()..];
        if let Some(candidate) = rest.get(..11)
            && is_video_id(candidate)
        {
            return Some(candidate.to_string());
        }
    }

    if host == "youtu.be" {
        let first = url.path().trim_start_matches('/').split('/').next()?;
        if is_video_id(first) {
            return Some(first.to_string());
        }
    }

    None
}

/// Piece of a chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Url(String),
    Youtube { url: String, video_id: String },
}

/// Split `text` into plain text, links and YouTube links
pub fn parse_content(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last_index = 0;
    let mut search_from = 0;

    while let Some(start) = find_url_start(text, search_from) {
        let end = text[start..]
            .find(|c: char| c.is_whitespace() || c == '<')
            .map(|len| start + len)
            .unwrap_or(text.len());
        search_from = end;

        if start > last_index {
            segments.push(Segment::Text(text[last_index..start].to_string()));
        }

        let url = text[start..end].trim_end_matches(TRAILING_PUNCTUATION);
        match extract_youtube_id(url) {
            Some(video_id) => segments.push(Segment::Youtube {
                url: url.to_string(),
                video_id,
            }),
            None => segments.push(Segment::Url(url.to_string())),
        }
        // stripped punctuation stays in the following text
        last_index = start + url.len();
    }

    if last_index < text.len() {
        segments.push(Segment::Text(text[last_index..].to_string()));
    }
    segments
}

/// First video id linked from `text`
pub fn first_video_id(text: &str) -> Option<String> {
    parse_content(text).into_iter().find_map(|segment| match segment {
        Segment::Youtube { video_id, .. } => Some(video_id),
        _ => None,
    })
}

fn find_url_start(text: &str, from: usize) -> Option<usize> {
    let lower = text.get(from..)?.to_ascii_lowercase();
    let http = lower.find("http://");
    let https = lower.find("https://");
    let offset = match (http, https) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => return None,
    };
    Some(from + offset)
}

/// `just now`, `Nm ago`, `Nh ago` or `Nd ago`
pub fn relative_time(now: Timestamp, then: Timestamp) -> String {
    let diff = (now - then).div_euclid(1000);
    if diff < 60 {
        "just now".to_string()
    } else if diff < 3_600 {
        format!("{}m ago", diff / 60)
    } else if diff < 86_400 {
        format!("{}h ago", diff / 3_600)
    } else {
        format!("{}d ago", diff / 86_400)
    }
}
