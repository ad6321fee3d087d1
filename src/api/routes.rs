use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::request_id::{make_span_with_request_id, request_id_middleware};

use super::handlers;
use super::AppState;

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Ratings
        .route("/users/discover", post(handlers::discover_users))
        .route(
            "/users/:user_id/ratings",
            get(handlers::get_ratings).put(handlers::put_ratings),
        )
        .route("/users/:user_id/ratings/sync", post(handlers::sync_ratings))
        // Rankings
        .route(
            "/rankings/:user_id",
            get(handlers::get_ranking).post(handlers::rank),
        )
        .route("/rankings/:user_id/extract", post(handlers::extract))
}
