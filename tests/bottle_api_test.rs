use std::env;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use bottle_backend::{
    middleware::{auth, rate_limit},
    routes,
    utils::telegram_auth::{sign_init_data, InitDataVerifier},
    AppState,
};
use serde_json::{json, Value as JsonValue};
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;
use uuid::Uuid;

const BOT_TOKEN: &str = "123456:TEST-BOTTLE-TOKEN";

async fn setup_app() -> (Router, sqlx::PgPool) {
    dotenvy::dotenv().ok();
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("pool");
    bottle_backend::database::pool::run_migrations(&pool)
        .await
        .expect("migrations");

    let verifier =
        InitDataVerifier::new(BOT_TOKEN).with_max_age(Some(Duration::from_secs(86_400)));
    let state = AppState::new(pool.clone(), verifier);

    let app = Router::new()
        .route("/api/me", get(routes::profile::get_me).patch(routes::profile::update_me))
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
            state.clone(),
            auth::load_current_user,
        ))
        .route_layer(axum::middleware::from_fn_with_state(
            rate_limit::RateLimiter::new(10_000),
            rate_limit::per_user_rps_middleware,
        ))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_telegram_auth,
        ))
        .with_state(state);

    (app, pool)
}

fn random_telegram_id() -> i64 {
    (Uuid::new_v4().as_u128() as i64 & 0x0000_ffff_ffff_ffff) + 1
}

fn init_data_for(telegram_id: i64, first_name: &str) -> String {
    let now = chrono::Utc::now().timestamp().to_string();
    let user = json!({ "id": telegram_id, "first_name": first_name }).to_string();
    sign_init_data(&[("auth_date", now.as_str()), ("user", user.as_str())], BOT_TOKEN)
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    init_data: &str,
    body: Option<JsonValue>,
) -> (StatusCode, JsonValue) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("tma {}", init_data));
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn cleanup(pool: &sqlx::PgPool, telegram_ids: &[i64]) {
    for telegram_id in telegram_ids {
        let _ = sqlx::query(
            r#"
            UPDATE bottles SET status = 'floating', caught_by = NULL, caught_at = NULL
            WHERE caught_by = (SELECT id FROM users WHERE telegram_id = $1)
            "#,
        )
        .bind(telegram_id)
        .execute(pool)
        .await;
        let _ = sqlx::query("DELETE FROM users WHERE telegram_id = $1")
            .bind(telegram_id)
            .execute(pool)
            .await;
    }
}

#[tokio::test]
async fn bottle_and_chat_flow_end_to_end() {
    let (app, pool) = setup_app().await;

    let (alice_id, bob_id, carol_id) =
        (random_telegram_id(), random_telegram_id(), random_telegram_id());
    let alice = init_data_for(alice_id, "Alice");
    let bob = init_data_for(bob_id, "Bob");
    let carol = init_data_for(carol_id, "Carol");

    // Alice throws a bottle.
    let content = format!("Hello from the shore {}", Uuid::new_v4());
    let (status, thrown) = call(&app, "POST", "/api/bottles", &alice, Some(json!({ "content": content }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(thrown["is_mine"], true);
    assert_eq!(thrown["status"], "floating");
    let bottle_id = thrown["id"].as_str().unwrap().to_string();

    let (status, _) = call(&app, "POST", "/api/bottles", &alice, Some(json!({ "content": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // No chat until someone catches it.
    let (status, body) = call(&app, "POST", &format!("/api/bottles/{}/chat", bottle_id), &alice, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "conflict");

    // Bob keeps fishing until Alice's bottle comes up.
    let mut caught = None;
    for _ in 0..1000 {
        let (status, bottle) = call(&app, "POST", "/api/bottles/catch", &bob, None).await;
        if status == StatusCode::NOT_FOUND {
            break;
        }
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bottle["is_mine"], false);
        if bottle["id"] == bottle_id.as_str() {
            caught = Some(bottle);
            break;
        }
    }
    let caught = caught.expect("Alice's bottle was never caught");
    assert_eq!(caught["content"], content.as_str());
    assert_eq!(caught["status"], "caught");

    // Strangers cannot see it.
    let (status, _) = call(&app, "GET", &format!("/api/bottles/{}", bottle_id), &carol, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, reply) = call(
        &app,
        "POST",
        &format!("/api/bottles/{}/replies", bottle_id),
        &bob,
        Some(json!({ "content": "Got it!" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["is_mine"], true);

    let (status, detail) = call(&app, "GET", &format!("/api/bottles/{}", bottle_id), &alice, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["bottle"]["reply_count"], 1);
    assert_eq!(detail["replies"][0]["content"], "Got it!");
    assert_eq!(detail["replies"][0]["is_mine"], false);
    assert!(detail["replies"][0].get("author_id").is_none());

    // Both sides land in the same chat.
    let (status, chat) = call(&app, "POST", &format!("/api/bottles/{}/chat", bottle_id), &bob, None).await;
    assert_eq!(status, StatusCode::OK);
    let chat_id = chat["id"].as_str().unwrap().to_string();
    let (_, again) = call(&app, "POST", &format!("/api/bottles/{}/chat", bottle_id), &alice, None).await;
    assert_eq!(again["id"], chat_id.as_str());

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/chats/{}/messages", chat_id),
        &alice,
        Some(json!({ "text": "Hi Bob" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, chats) = call(&app, "GET", "/api/chats", &bob, None).await;
    let listed = chats["chats"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == chat_id.as_str())
        .expect("chat listed for Bob")
        .clone();
    assert_eq!(listed["unread_messages"], 1);

    let (status, history) = call(&app, "GET", &format!("/api/chats/{}/messages", chat_id), &bob, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["messages"][0]["text"], "Hi Bob");
    assert_eq!(history["messages"][0]["is_mine"], false);
    assert_eq!(history["chat"]["unread_messages"], 0);

    let (status, _) = call(&app, "GET", &format!("/api/chats/{}/messages", chat_id), &carol, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, closed) = call(&app, "POST", &format!("/api/chats/{}/close", chat_id), &bob, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(closed["status"], "closed");

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/chats/{}/messages", chat_id),
        &alice,
        Some(json!({ "text": "Still there?" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Only the catcher can release, only the author can delete.
    let (status, _) = call(&app, "POST", &format!("/api/bottles/{}/release", bottle_id), &alice, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "POST", &format!("/api/bottles/{}/release", bottle_id), &bob, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, profile) = call(&app, "GET", "/api/me", &alice, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["user"]["telegram_id"], alice_id);
    assert_eq!(profile["stats"]["bottles_thrown"], 1);

    let (status, updated) = call(&app, "PATCH", "/api/me", &alice, Some(json!({ "bio": "  sailor  " }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["bio"], "sailor");

    let (status, _) = call(&app, "DELETE", &format!("/api/bottles/{}", bottle_id), &bob, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, "DELETE", &format!("/api/bottles/{}", bottle_id), &alice, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    cleanup(&pool, &[alice_id, bob_id, carol_id]).await;
}
