//! Request identity extraction from the session headers.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    domain::{Identity, UserId},
    infrastructure::dto::http::{USER_ID_HEADER, USER_NAME_HEADER},
    ui::state::AppState,
};

use super::error::ApiError;

/// Acting identity of a request; rejects with 401 when headers are missing
pub struct SessionUser(pub Identity);

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl FromRequestParts<Arc<AppState>> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, USER_ID_HEADER)
            .and_then(|value| UserId::new(value).ok())
            .ok_or_else(ApiError::unauthorized)?;
        let user_name =
            header_value(parts, USER_NAME_HEADER).unwrap_or_else(|| user_id.as_str().to_string());
        let is_admin = state.admins.contains(user_id.as_str());

        Ok(SessionUser(Identity {
            user_id,
            user_name,
            is_admin,
        }))
    }
}
