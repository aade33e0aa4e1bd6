//! Stream rewriting route.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use relay_engine::Manifest;
use tracing::debug;

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::StreamQuery;
use crate::api::server::AppState;

pub const STREAM_PATH: &str = "/get_best_stream";

/// Create the stream router.
pub fn router() -> Router<AppState> {
    Router::new().route(STREAM_PATH, get(get_best_stream))
}

/// Rewrites the requested master playlist and returns the cached manifest.
pub async fn get_best_stream(
    State(state): State<AppState>,
    query: Result<Query<StreamQuery>, QueryRejection>,
) -> ApiResult<Json<Manifest>> {
    let Query(query) = query.map_err(|e| {
        debug!(error = %e, "Rejected stream query");
        ApiError::in_band("Invalid query string")
    })?;

    let manifest = state
        .relay
        .handle(query.url.as_deref(), query.referer.as_deref())
        .await?;

    Ok(Json(manifest))
}
