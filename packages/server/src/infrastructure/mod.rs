//! Infrastructure layer: storage, realtime relay and wire DTOs.

pub mod dto;
pub mod realtime;
pub mod repository;
