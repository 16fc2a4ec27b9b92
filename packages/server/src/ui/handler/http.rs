//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde_json::{Map, Value};

use crate::{
    domain::Timestamp,
    infrastructure::dto::http::{
        ConfigResponse, DeleteMessageRequest, DeleteMessageResponse, MessageDto, MessagesQuery,
        MessagesResponse, PostMessageRequest, PostMessageResponse, ProductConfigDto, VideoDto,
        VideosQuery, VideosResponse,
    },
    ui::state::AppState,
};

use super::{error::ApiError, identity::SessionUser};

/// Health check endpoint
pub async fn health_check() -> Json<Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// `GET /api/config`
pub async fn get_config(State(state): State<Arc<AppState>>) -> Result<Json<ConfigResponse>, ApiError> {
    let config = state.get_config_usecase.execute().await?;

    // Domain Model から DTO への変換
    let response: ConfigResponse = config
        .into_iter()
        .map(|(name, product)| (name, ProductConfigDto::from(product)))
        .collect();

    Ok(Json(response))
}

/// `PUT /api/config/{product}` (admin only)
pub async fn put_config(
    State(state): State<Arc<AppState>>,
    SessionUser(identity): SessionUser,
    Path(product): Path<String>,
    Json(body): Json<ProductConfigDto>,
) -> Result<Json<ProductConfigDto>, ApiError> {
    if !identity.is_admin {
        return Err(ApiError::forbidden());
    }
    let updated = state
        .update_config_usecase
        .execute(product, body.into())
        .await?;
    Ok(Json(updated.into()))
}

/// `GET /api/messages?limit=N&before=RFC3339&breaking=bool`
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    SessionUser(_identity): SessionUser,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let before = query.before.map(|dt| Timestamp::new(dt.timestamp_millis()));
    let page = state
        .list_messages_usecase
        .execute(query.limit, before, query.breaking.unwrap_or(false))
        .await?;

    Ok(Json(MessagesResponse {
        messages: page.messages.into_iter().map(MessageDto::from).collect(),
        has_more: page.has_more,
    }))
}

/// `POST /api/messages`
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    SessionUser(identity): SessionUser,
    Json(body): Json<PostMessageRequest>,
) -> Result<Json<PostMessageResponse>, ApiError> {
    let message = state
        .post_message_usecase
        .execute(&identity, body.content, body.is_breaking_news)
        .await?;

    Ok(Json(PostMessageResponse {
        message: message.into(),
    }))
}

/// `DELETE /api/messages`
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    SessionUser(identity): SessionUser,
    Json(body): Json<DeleteMessageRequest>,
) -> Result<Json<DeleteMessageResponse>, ApiError> {
    let deleted = state
        .delete_message_usecase
        .execute(&identity, &body.message_id)
        .await?;

    Ok(Json(DeleteMessageResponse {
        deleted: deleted.to_string(),
    }))
}

/// `GET /api/preferences`
pub async fn get_preferences(
    State(state): State<Arc<AppState>>,
    SessionUser(identity): SessionUser,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let preferences = state
        .get_preferences_usecase
        .execute(&identity.user_id)
        .await?;
    Ok(Json(preferences))
}

/// `PATCH /api/preferences` (shallow merge)
pub async fn patch_preferences(
    State(state): State<Arc<AppState>>,
    SessionUser(identity): SessionUser,
    Json(patch): Json<Map<String, Value>>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let merged = state
        .update_preferences_usecase
        .execute(&identity.user_id, patch)
        .await?;
    Ok(Json(merged))
}

/// `GET /api/videos?tv=1`
pub async fn get_videos(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VideosQuery>,
) -> Result<Json<VideosResponse>, ApiError> {
    let tv_only = query.tv == Some(1);
    let videos = state.list_videos_usecase.execute(tv_only).await?;

    Ok(Json(VideosResponse {
        videos: videos.into_iter().map(VideoDto::from).collect(),
    }))
}
