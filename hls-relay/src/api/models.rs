//! API request and response models.

use serde::{Deserialize, Serialize};

/// Query of the stream endpoint.
///
/// ```text
/// GET /get_best_stream?url=https://cdn.example.com/master.m3u8&referer=https://example.com/
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamQuery {
    /// Absolute URL of the upstream master playlist
    pub url: Option<String>,
    /// Page whose origin is presented upstream as Origin/Referer
    pub referer: Option<String>,
}

/// Error body shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Self-check probe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfCheckResponse {
    pub ok: bool,
    /// Unix timestamp in milliseconds
    pub time: i64,
}
