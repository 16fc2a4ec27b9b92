//! Domain layer: entities, value objects and the repository interface.

pub mod entity;
pub mod error;
pub mod repository;
pub mod value_object;

pub use entity::{ChatMessage, Identity, MessagePage, MessageQuery, ProductConfig, Video};
pub use error::{RepositoryError, ValueObjectError};
pub use repository::DashboardRepository;
pub use value_object::{MessageContent, MessageId, Timestamp, UserId};
