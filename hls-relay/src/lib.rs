//! hls-relay application crate.
//!
//! Hosts the HTTP surface around [`relay_engine`]: the stream endpoint, static
//! serving of the playlist cache, and the self-check probe.

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;

pub use error::{Error, Result};
