pub mod auth_dto;
pub mod bottle_dto;
pub mod chat_dto;
pub mod profile_dto;
