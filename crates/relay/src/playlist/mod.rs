//! Line-based HLS playlist handling.

mod master;
mod rewrite;

pub use master::{STREAM_INF_TAG, StreamEntry, VariantDescriptor, parse_master, parse_stream_entries};
pub use rewrite::{proxied_url, rewrite_variant};

/// Splits playlist text into lines, accepting both `\n` and `\r\n` endings.
pub(crate) fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line))
}
