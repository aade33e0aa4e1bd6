//! Static serving of cached playlists.

use std::path::Path;

use tower_http::services::ServeDir;

/// Serves files below the cache root, e.g. `/stream_cache/<key>/master.m3u8`.
pub fn service(cache_root: &Path) -> ServeDir {
    ServeDir::new(cache_root)
}
