use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use bottle_backend::{
    config::{get_config, init_config},
    database::pool::{create_pool, run_migrations},
    middleware::{auth, cors::webapp_cors, rate_limit},
    routes,
    utils::telegram_auth::redact_bot_token,
    AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    init_config()?;
    let config = get_config();

    info!(
        bot_token = %redact_bot_token(&config.telegram_bot_token),
        max_age_secs = config.init_data_max_age_secs,
        "Telegram init data verification configured"
    );
    if config.telegram_bot_token.is_empty() {
        tracing::warn!("TELEGRAM_BOT_TOKEN is empty; authenticated routes will answer 500");
    }

    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;

    let app_state = AppState::from_config(pool, config);

    let base_routes = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/auth/telegram", post(routes::auth::telegram_login));

    // Layers run bottom-up: verify init data, rate limit per Telegram user,
    // then resolve the stored user.
    let user_api = Router::new()
        .route(
            "/api/me",
            get(routes::profile::get_me).patch(routes::profile::update_me),
        )
        .route("/api/me/stats", get(routes::profile::get_stats))
        .route("/api/bottles", post(routes::bottles::throw_bottle))
        .route("/api/bottles/mine", get(routes::bottles::list_my_bottles))
        .route("/api/bottles/caught", get(routes::bottles::list_caught_bottles))
        .route("/api/bottles/catch", post(routes::bottles::catch_bottle))
        .route(
            "/api/bottles/:id",
            get(routes::bottles::get_bottle).delete(routes::bottles::delete_bottle),
        )
        .route("/api/bottles/:id/release", post(routes::bottles::release_bottle))
        .route("/api/bottles/:id/replies", post(routes::bottles::reply_to_bottle))
        .route("/api/bottles/:id/chat", post(routes::bottles::open_chat))
        .route("/api/chats", get(routes::chats::list_chats))
        .route(
            "/api/chats/:id/messages",
            get(routes::chats::get_messages).post(routes::chats::send_message),
        )
        .route("/api/chats/:id/close", post(routes::chats::close_chat))
        .route_layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            auth::load_current_user,
        ))
        .route_layer(axum::middleware::from_fn_with_state(
            rate_limit::RateLimiter::new(config.public_rps),
            rate_limit::per_user_rps_middleware,
        ))
        .route_layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            auth::require_telegram_auth,
        ));

    let app = base_routes
        .merge(user_api)
        .with_state(app_state)
        .layer(webapp_cors(config.webapp_url.as_deref()))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(64 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
