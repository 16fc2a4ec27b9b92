//! Server state shared by every handler.

use std::{collections::HashSet, sync::Arc};

use arrboard_shared::time::Clock;

use crate::{
    domain::DashboardRepository,
    infrastructure::realtime::RealtimeHub,
    usecase::{
        DeleteMessageUseCase, GetConfigUseCase, GetPreferencesUseCase, ListMessagesUseCase,
        ListVideosUseCase, PostMessageUseCase, UpdateConfigUseCase, UpdatePreferencesUseCase,
    },
};

/// Shared application state
pub struct AppState {
    pub get_config_usecase: Arc<GetConfigUseCase>,
    pub update_config_usecase: Arc<UpdateConfigUseCase>,
    pub list_messages_usecase: Arc<ListMessagesUseCase>,
    pub post_message_usecase: Arc<PostMessageUseCase>,
    pub delete_message_usecase: Arc<DeleteMessageUseCase>,
    pub get_preferences_usecase: Arc<GetPreferencesUseCase>,
    pub update_preferences_usecase: Arc<UpdatePreferencesUseCase>,
    pub list_videos_usecase: Arc<ListVideosUseCase>,
    /// Realtime relay（ブロードキャストとプレゼンス）
    pub hub: Arc<RealtimeHub>,
    /// User ids with elevated privilege
    pub admins: HashSet<String>,
}

impl AppState {
    /// Wire every usecase onto one repository
    pub fn new(
        repository: Arc<dyn DashboardRepository>,
        clock: Arc<dyn Clock>,
        admins: HashSet<String>,
    ) -> Self {
        Self {
            get_config_usecase: Arc::new(GetConfigUseCase::new(repository.clone())),
            update_config_usecase: Arc::new(UpdateConfigUseCase::new(repository.clone())),
            list_messages_usecase: Arc::new(ListMessagesUseCase::new(repository.clone())),
            post_message_usecase: Arc::new(PostMessageUseCase::new(repository.clone(), clock)),
            delete_message_usecase: Arc::new(DeleteMessageUseCase::new(repository.clone())),
            get_preferences_usecase: Arc::new(GetPreferencesUseCase::new(repository.clone())),
            update_preferences_usecase: Arc::new(UpdatePreferencesUseCase::new(
                repository.clone(),
            )),
            list_videos_usecase: Arc::new(ListVideosUseCase::new(repository)),
            hub: Arc::new(RealtimeHub::new()),
            admins,
        }
    }
}
