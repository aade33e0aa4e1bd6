//! Self-check route.

use axum::{Json, Router, routing::get};

use crate::api::models::SelfCheckResponse;
use crate::api::server::AppState;

pub const SELF_CHECK_PATH: &str = "/self-check";

/// Create the health router.
pub fn router() -> Router<AppState> {
    Router::new().route(SELF_CHECK_PATH, get(self_check))
}

/// Liveness probe with the current server time.
async fn self_check() -> Json<SelfCheckResponse> {
    Json(SelfCheckResponse {
        ok: true,
        time: chrono::Utc::now().timestamp_millis(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_ok_with_current_time() {
        let before = chrono::Utc::now().timestamp_millis();
        let Json(response) = self_check().await;
        assert!(response.ok);
        assert!(response.time >= before);
    }
}
