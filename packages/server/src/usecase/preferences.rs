//! UseCase: per-user preferences (video state, ticker speed, progress).

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::domain::{DashboardRepository, UserId};

use super::error::UseCaseError;

/// プリファレンス取得のユースケース
pub struct GetPreferencesUseCase {
    repository: Arc<dyn DashboardRepository>,
}

impl GetPreferencesUseCase {
    pub fn new(repository: Arc<dyn DashboardRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self, user_id: &UserId) -> Result<Map<String, Value>, UseCaseError> {
        Ok(self.repository.get_preferences(user_id).await?)
    }
}

/// プリファレンス更新（シャローマージ）のユースケース
pub struct UpdatePreferencesUseCase {
    repository: Arc<dyn DashboardRepository>,
}

impl UpdatePreferencesUseCase {
    pub fn new(repository: Arc<dyn DashboardRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(
        &self,
        user_id: &UserId,
        patch: Map<String, Value>,
    ) -> Result<Map<String, Value>, UseCaseError> {
        Ok(self.repository.merge_preferences(user_id, patch).await?)
    }
}
