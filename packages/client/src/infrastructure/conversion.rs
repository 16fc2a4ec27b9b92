//! Wire DTO <-> client domain conversions.

use arrboard_server::infrastructure::dto::{
    http::{MessageDto, ProductConfigDto, VideoDto},
    realtime::{DeleteMessagePayload, PlayNowPayload},
};
use arrboard_shared::time::millis_to_datetime;
use serde_json::Value;

use crate::domain::{ChatMessage, ProductMetric, Video};

/// A payload missing a required field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField(pub &'static str);

impl TryFrom<MessageDto> for ChatMessage {
    type Error = MissingField;

    fn try_from(dto: MessageDto) -> Result<Self, Self::Error> {
        if dto.id.trim().is_empty() {
            return Err(MissingField("id"));
        }
        Ok(ChatMessage {
            id: dto.id,
            content: dto.content,
            author_id: dto.user_id,
            author_name: dto.user_name,
            created_at: dto.created_at.timestamp_millis(),
            is_breaking_news: dto.is_breaking_news,
        })
    }
}

impl From<&ChatMessage> for MessageDto {
    fn from(message: &ChatMessage) -> Self {
        MessageDto {
            id: message.id.clone(),
            content: message.content.clone(),
            user_id: message.author_id.clone(),
            user_name: message.author_name.clone(),
            created_at: millis_to_datetime(message.created_at),
            is_breaking_news: message.is_breaking_news,
        }
    }
}

impl From<ProductConfigDto> for ProductMetric {
    fn from(dto: ProductConfigDto) -> Self {
        ProductMetric {
            base_value: dto.arr,
            annual_growth_rate: dto.growth_rate,
            month_delta: dto.month_growth,
            last_synced_at: dto.updated_at,
        }
    }
}

impl From<VideoDto> for Video {
    fn from(dto: VideoDto) -> Self {
        Video {
            id: dto.id,
            youtube_id: dto.youtube_id,
            title: dto.title,
            position: dto.position,
        }
    }
}

/// Decode a `new_message` payload; malformed payloads yield `None`
pub fn decode_message(payload: &Value) -> Option<ChatMessage> {
    let dto: MessageDto = match serde_json::from_value(payload.clone()) {
        Ok(dto) => dto,
        Err(e) => {
            tracing::debug!("Dropping malformed message payload: {}", e);
            return None;
        }
    };
    match ChatMessage::try_from(dto) {
        Ok(message) => Some(message),
        Err(MissingField(field)) => {
            tracing::debug!("Dropping message payload without {}", field);
            None
        }
    }
}

/// Decode a `delete_message` payload into the deleted id
pub fn decode_deleted_id(payload: &Value) -> Option<String> {
    serde_json::from_value::<DeleteMessagePayload>(payload.clone())
        .ok()
        .map(|p| p.id)
        .filter(|id| !id.trim().is_empty())
        .or_else(|| {
            tracing::debug!("Dropping malformed delete payload");
            None
        })
}

/// Decode a `play_now` payload into a video id
pub fn decode_play_now(payload: &Value) -> Option<String> {
    serde_json::from_value::<PlayNowPayload>(payload.clone())
        .ok()
        .map(|p| p.youtube_id)
        .filter(|id| !id.trim().is_empty())
        .or_else(|| {
            tracing::debug!("Dropping malformed play_now payload");
            None
        })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_message_from_broadcast_payload() {
        // テスト項目: new_message ペイロードを ChatMessage に変換できる
        // given (前提条件):
        let payload = json!({
            "id": "m1",
            "content": "hello",
            "userId": "alice",
            "userName": "Alice",
            "createdAt": "2024-01-01T00:00:00Z",
            "isBreakingNews": true
        });

        // when (操作):
        let message = decode_message(&payload);

        // then (期待する結果):
        let message = message.unwrap();
        assert_eq!(message.id, "m1");
        assert_eq!(message.author_name, "Alice");
        assert_eq!(message.created_at, 1_704_067_200_000);
        assert!(message.is_breaking_news);
    }

    #[test]
    fn test_decode_message_drops_missing_id() {
        // テスト項目: id のないペイロードは破棄される
        // given (前提条件):
        let without_id = json!({"content": "x", "userId": "a", "userName": "A", "createdAt": "2024-01-01T00:00:00Z"});
        let blank_id = json!({"id": " ", "content": "x", "userId": "a", "userName": "A", "createdAt": "2024-01-01T00:00:00Z"});

        // when (操作):
        let decoded = (decode_message(&without_id), decode_message(&blank_id));

        // then (期待する結果):
        assert_eq!(decoded, (None, None));
    }

    #[test]
    fn test_decode_delete_and_play_now() {
        // テスト項目: 削除と play_now のペイロードを解釈できる
        // given (前提条件):
        let delete = json!({"id": "m9"});
        let play = json!({"youtubeId": "dQw4w9WgXcQ"});

        // when (操作):
        let decoded = (
            decode_deleted_id(&delete),
            decode_play_now(&play),
            decode_deleted_id(&json!({})),
        );

        // then (期待する結果):
        assert_eq!(
            decoded,
            (Some("m9".to_string()), Some("dQw4w9WgXcQ".to_string()), None)
        );
    }

    #[test]
    fn test_message_round_trips_through_dto() {
        // テスト項目: ChatMessage を DTO に変換して戻すと同じ値になる
        // given (前提条件):
        let message = ChatMessage {
            id: "m1".to_string(),
            content: "hi".to_string(),
            author_id: "alice".to_string(),
            author_name: "Alice".to_string(),
            created_at: 1_704_067_200_123,
            is_breaking_news: false,
        };

        // when (操作):
        let back = ChatMessage::try_from(MessageDto::from(&message));

        // then (期待する結果):
        assert_eq!(back, Ok(message));
    }
}
