pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::services::{
    bottle_service::BottleService, chat_service::ChatService, user_service::UserService,
};
use crate::utils::telegram_auth::InitDataVerifier;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub verifier: Arc<InitDataVerifier>,
    pub user_service: UserService,
    pub bottle_service: BottleService,
    pub chat_service: ChatService,
}

impl AppState {
    pub fn new(pool: PgPool, verifier: InitDataVerifier) -> Self {
        let user_service = UserService::new(pool.clone());
        let bottle_service = BottleService::new(pool.clone());
        let chat_service = ChatService::new(pool.clone());

        Self {
            pool,
            verifier: Arc::new(verifier),
            user_service,
            bottle_service,
            chat_service,
        }
    }

    /// Every authenticated route enforces the configured max age.
    pub fn from_config(pool: PgPool, config: &Config) -> Self {
        let verifier = InitDataVerifier::new(&config.telegram_bot_token)
            .with_max_age(Some(config.init_data_max_age()))
            .with_future_tolerance(config.init_data_future_skew());
        Self::new(pool, verifier)
    }
}
