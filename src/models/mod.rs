pub mod bottle;
pub mod chat;
pub mod user;
