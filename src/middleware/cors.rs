use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

use super::auth::INIT_DATA_HEADER;

/// Restricts CORS to the Mini App origin when one is configured.
pub fn webapp_cors(webapp_url: Option<&str>) -> CorsLayer {
    let Some(origin) = webapp_url.and_then(|url| HeaderValue::from_str(url.trim_end_matches('/')).ok())
    else {
        tracing::warn!("WEBAPP_URL is not set; CORS allows any origin");
        return CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_origin(Any);
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(INIT_DATA_HEADER),
        ])
}
