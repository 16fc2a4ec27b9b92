//! UseCase: product figures and background videos.

use std::sync::Arc;

use crate::domain::{DashboardRepository, ProductConfig, Video};

use super::error::UseCaseError;

/// 全プロダクトの数値を取得するユースケース
pub struct GetConfigUseCase {
    repository: Arc<dyn DashboardRepository>,
}

impl GetConfigUseCase {
    pub fn new(repository: Arc<dyn DashboardRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self) -> Result<Vec<(String, ProductConfig)>, UseCaseError> {
        Ok(self.repository.get_config().await?)
    }
}

/// Replace the figures of one product (admin only, checked by the handler)
pub struct UpdateConfigUseCase {
    repository: Arc<dyn DashboardRepository>,
}

impl UpdateConfigUseCase {
    pub fn new(repository: Arc<dyn DashboardRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(
        &self,
        product: String,
        config: ProductConfig,
    ) -> Result<ProductConfig, UseCaseError> {
        self.repository.put_config(product.clone(), config).await?;
        tracing::info!("Config for '{}' updated (arr={})", product, config.arr);
        Ok(config)
    }
}

/// 動画一覧を取得するユースケース
pub struct ListVideosUseCase {
    repository: Arc<dyn DashboardRepository>,
}

impl ListVideosUseCase {
    pub fn new(repository: Arc<dyn DashboardRepository>) -> Self {
        Self { repository }
    }

    pub async fn execute(&self, tv_only: bool) -> Result<Vec<Video>, UseCaseError> {
        Ok(self.repository.list_videos(tv_only).await?)
    }
}
