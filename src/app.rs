use axum::Router;
use http::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::routes::{admin, events, health, news, sources};
use crate::state::AppState;

/// The read/ops HTTP surface (spec.md §2 "(new) Process shape"): the CEG
/// pipeline itself has no HTTP entry points, but operators and downstream
/// consumers need to query News/Event/causal-chain state and nudge Source
/// health, so one `axum::Router` is mounted alongside the background tasks
/// in the same binary, following the teacher's `create_app` layout.
pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
            origin.as_bytes().starts_with(b"http://localhost:")
                || origin.as_bytes().starts_with(b"http://127.0.0.1:")
        }))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    Router::<AppState>::new()
        .nest("/health", health::router())
        .nest("/api/news", news::router())
        .nest("/api/events", events::router())
        .nest("/api/sources", sources::router())
        .nest("/api/admin", admin::router())
        .with_state(state)
        .layer(cors)
}
