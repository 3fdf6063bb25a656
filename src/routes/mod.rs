pub mod auth;
pub mod bottles;
pub mod chats;
pub mod health;
pub mod profile;
