//! Conversion logic between DTOs and domain entities.

use arrboard_shared::time::millis_to_datetime;

use crate::domain::{ChatMessage, ProductConfig, Video};
use crate::infrastructure::dto::http as dto;

// ========================================
// Domain Entity → DTO
// ========================================

impl From<ChatMessage> for dto::MessageDto {
    fn from(model: ChatMessage) -> Self {
        Self {
            id: model.id.to_string(),
            content: model.content.into_string(),
            user_id: model.author_id.into_string(),
            user_name: model.author_name,
            created_at: millis_to_datetime(model.created_at.value()),
            is_breaking_news: model.is_breaking_news,
        }
    }
}

impl From<ProductConfig> for dto::ProductConfigDto {
    fn from(model: ProductConfig) -> Self {
        Self {
            arr: model.arr,
            growth_rate: model.growth_rate,
            month_growth: model.month_growth,
            updated_at: model.updated_at,
        }
    }
}

impl From<Video> for dto::VideoDto {
    fn from(model: Video) -> Self {
        Self {
            id: model.id,
            youtube_id: model.youtube_id,
            title: model.title,
            position: model.position,
            tv_enabled: model.tv_enabled,
        }
    }
}

// ========================================
// DTO → Domain Entity
// ========================================

impl From<dto::ProductConfigDto> for ProductConfig {
    fn from(dto: dto::ProductConfigDto) -> Self {
        Self {
            arr: dto.arr,
            growth_rate: dto.growth_rate,
            month_growth: dto.month_growth,
            updated_at: dto.updated_at,
        }
    }
}
