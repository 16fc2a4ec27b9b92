//! UseCase layer: application operations behind the HTTP handlers.

pub mod dashboard;
pub mod error;
pub mod messages;
pub mod preferences;

pub use dashboard::{GetConfigUseCase, ListVideosUseCase, UpdateConfigUseCase};
pub use error::{DeleteMessageError, PostMessageError, UseCaseError};
pub use messages::{
    DEFAULT_PAGE_SIZE, DeleteMessageUseCase, ListMessagesUseCase, MAX_PAGE_SIZE,
    PostMessageUseCase,
};
pub use preferences::{GetPreferencesUseCase, UpdatePreferencesUseCase};
