//! API route definitions.

use axum::http::{HeaderValue, Method, header};
use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::auth_middleware;

use super::handlers;
use super::state::AppState;

/// Local origins always allowed in dev mode.
const DEV_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:5173",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:5173",
];

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let auth_state = state.auth.clone();

    // Protected routes (require authentication)
    let protected_routes = Router::new()
        .route("/threads", get(handlers::list_threads))
        .route(
            "/threads/{thread_id}/messages",
            get(handlers::list_messages).post(handlers::post_message),
        )
        .route("/threads/{thread_id}/read", post(handlers::mark_read))
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware))
        .with_state(state.clone());

    // Public routes (no authentication)
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/login", post(handlers::login))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .nest("/api", protected_routes)
        .layer(ServiceBuilder::new().layer(trace_layer).layer(cors))
}

/// Build the CORS layer based on configuration.
///
/// In dev mode local origins are always allowed. In production mode,
/// requires explicit origin configuration.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let dev_mode = state.auth.is_dev_mode();

    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    let headers = [
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        header::ACCEPT,
        header::ORIGIN,
        header::COOKIE,
        header::HeaderName::from_static("x-dev-user"),
    ];

    let mut origins: Vec<HeaderValue> = state
        .auth
        .allowed_origins()
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("CORS: Invalid origin in config: {}", origin);
                None
            })
        })
        .collect();

    if dev_mode {
        for origin in DEV_ORIGINS {
            let value = HeaderValue::from_static(origin);
            if !origins.contains(&value) {
                origins.push(value);
            }
        }
    }

    if origins.is_empty() {
        tracing::warn!("CORS: No usable origins configured, denying all cross-origin requests");
        CorsLayer::new().allow_origin(AllowOrigin::exact(HeaderValue::from_static("null")))
    } else {
        tracing::info!("CORS: Allowing {} origin(s)", origins.len());
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(headers)
            .allow_credentials(true)
    }
}
