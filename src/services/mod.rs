pub mod bottle_service;
pub mod chat_service;
pub mod user_service;
