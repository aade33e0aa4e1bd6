//! API route modules.

pub mod cache;
pub mod health;
pub mod stream;

use axum::Router;

use crate::api::server::AppState;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    let prefix = state.relay.config().public_prefix.trim_matches('/');
    let cache_files = cache::service(state.relay.cache().root());

    let router = Router::new()
        .merge(stream::router())
        .merge(health::router());

    // axum cannot nest at the root; an empty prefix serves the cache as fallback.
    let router = if prefix.is_empty() {
        router.fallback_service(cache_files)
    } else {
        router.nest_service(&format!("/{prefix}"), cache_files)
    };

    router.with_state(state)
}
