//! HLS relay engine.
//!
//! Rewrites HLS playlists so that every segment and variant reference is routed
//! through a local proxy endpoint, and caches the rewritten playlists on disk
//! keyed by request identity.
//!
//! # Pipeline
//!
//! ```text
//!  StreamRequest ──► CacheManager::lookup ──► hit ──► Manifest
//!                          │
//!                         miss
//!                          ▼
//!   fetch master ─► parse_master ─► fetch variants (fan-out)
//!                                          │
//!                                          ▼
//!                  rewrite_variant ─► CacheManager::store ─► Manifest
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod playlist;
pub mod relay;
pub mod request;
pub mod resolver;

pub use cache::{CacheEntry, CacheManager, RewrittenVariant, VariantPlaylist};
pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use fetch::{HttpFetcher, PlaylistFetcher};
pub use playlist::{StreamEntry, VariantDescriptor, parse_master, rewrite_variant};
pub use relay::{Manifest, ManifestVariant, Relay};
pub use request::StreamRequest;
