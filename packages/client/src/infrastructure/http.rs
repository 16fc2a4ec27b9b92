//! REST gateway over reqwest.

use std::collections::BTreeMap;

use arrboard_server::infrastructure::dto::http::{
    ConfigResponse, DeleteMessageRequest, DeleteMessageResponse, ErrorResponse, MessageDto,
    MessagesQuery, MessagesResponse, PostMessageRequest, PostMessageResponse, USER_ID_HEADER,
    USER_NAME_HEADER, VideosQuery, VideosResponse,
};
use arrboard_shared::time::millis_to_datetime;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{
    domain::{
        ChatMessage, ConfigGateway, Identity, MessageGateway, MessagePage, PageRequest,
        Preferences, PreferencesGateway, ProductMetric, Video, VideoGateway,
    },
    error::GatewayError,
};

/// Talks to the dashboard backend as one identity
#[derive(Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    identity: Identity,
}

impl HttpGateway {
    /// `base_url` is the server origin, e.g. `http://127.0.0.1:8080`
    pub fn new(base_url: impl Into<String>, identity: Identity) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            identity,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/api{}", self.base_url, path))
            .header(USER_ID_HEADER, self.identity.user_id.as_str())
            .header(USER_NAME_HEADER, self.identity.user_name.as_str())
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, GatewayError> {
        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(GatewayError::Unauthorized);
        }
        if !status.is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.error,
                Err(_) => status.canonical_reason().unwrap_or("error").to_string(),
            };
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

/// Realtime endpoint for a server origin (`http` -> `ws`, `https` -> `wss`)
pub fn realtime_url(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let ws = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}/ws", ws)
}

fn into_messages(dtos: Vec<MessageDto>) -> Vec<ChatMessage> {
    dtos.into_iter()
        .filter_map(|dto| match ChatMessage::try_from(dto) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::debug!("Skipping message without {}", e.0);
                None
            }
        })
        .collect()
}

#[async_trait]
impl MessageGateway for HttpGateway {
    async fn list_messages(&self, request: PageRequest) -> Result<MessagePage, GatewayError> {
        let query = MessagesQuery {
            limit: Some(request.limit),
            before: request.before.map(millis_to_datetime),
            breaking: request.breaking_only.then_some(true),
        };
        let response: MessagesResponse = self
            .send(self.request(Method::GET, "/messages").query(&query))
            .await?;

        Ok(MessagePage {
            messages: into_messages(response.messages),
            has_more: response.has_more,
        })
    }

    async fn post_message(
        &self,
        content: String,
        is_breaking_news: bool,
    ) -> Result<ChatMessage, GatewayError> {
        let body = PostMessageRequest {
            content,
            is_breaking_news,
        };
        let response: PostMessageResponse = self
            .send(self.request(Method::POST, "/messages").json(&body))
            .await?;

        ChatMessage::try_from(response.message)
            .map_err(|e| GatewayError::Decode(format!("message without {}", e.0)))
    }

    async fn delete_message(&self, id: String) -> Result<(), GatewayError> {
        let body = DeleteMessageRequest { message_id: id };
        let _: DeleteMessageResponse = self
            .send(self.request(Method::DELETE, "/messages").json(&body))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ConfigGateway for HttpGateway {
    async fn fetch_config(&self) -> Result<BTreeMap<String, ProductMetric>, GatewayError> {
        let response: ConfigResponse = self.send(self.request(Method::GET, "/config")).await?;
        Ok(response
            .into_iter()
            .map(|(name, dto)| (name, ProductMetric::from(dto)))
            .collect())
    }
}

#[async_trait]
impl PreferencesGateway for HttpGateway {
    async fn fetch_preferences(&self) -> Result<Preferences, GatewayError> {
        let map: Map<String, Value> = self.send(self.request(Method::GET, "/preferences")).await?;
        Ok(Preferences::new(map))
    }

    async fn patch_preferences(
        &self,
        patch: Map<String, Value>,
    ) -> Result<Preferences, GatewayError> {
        let map: Map<String, Value> = self
            .send(self.request(Method::PATCH, "/preferences").json(&patch))
            .await?;
        Ok(Preferences::new(map))
    }
}

#[async_trait]
impl VideoGateway for HttpGateway {
    async fn list_videos(&self, tv_only: bool) -> Result<Vec<Video>, GatewayError> {
        let query = VideosQuery {
            tv: tv_only.then_some(1),
        };
        let response: VideosResponse = self
            .send(self.request(Method::GET, "/videos").query(&query))
            .await?;

        let mut videos: Vec<Video> = response.videos.into_iter().map(Video::from).collect();
        videos.sort_by_key(|v| v.position);
        Ok(videos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_url_from_origin() {
        // テスト項目: サーバーのオリジンから WebSocket の URL を組み立てる
        // given (前提条件):
        let origins = ["http://127.0.0.1:8080", "https://dash.example.com/"];

        // when (操作):
        let urls: Vec<String> = origins.iter().map(|o| realtime_url(o)).collect();

        // then (期待する結果):
        assert_eq!(
            urls,
            vec!["ws://127.0.0.1:8080/ws", "wss://dash.example.com/ws"]
        );
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        // テスト項目: ベース URL 末尾のスラッシュは取り除かれる
        // given (前提条件):
        let identity = Identity::new("alice", "Alice");

        // when (操作):
        let gateway = HttpGateway::new("http://localhost:8080/", identity);

        // then (期待する結果):
        assert_eq!(gateway.base_url(), "http://localhost:8080");
    }
}
