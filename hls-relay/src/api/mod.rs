//! HTTP API.
//!
//! Provides the stream rewriting endpoint, static serving of cached playlists
//! and the self-check probe.

pub mod error;
pub mod models;
pub mod routes;
pub mod server;

pub use server::{ApiServer, AppState};
