//! Variant playlist rewriting: every URI line is routed through the proxy prefix.

use crate::resolver::resolve;

/// Builds the proxy URL for an absolute upstream URL.
pub fn proxied_url(proxy_prefix: &str, absolute_url: &str, referer: &str) -> String {
    format!(
        "{proxy_prefix}{}&referer={}",
        urlencoding::encode(absolute_url),
        urlencoding::encode(referer)
    )
}

/// Rewrites a variant (media) playlist.
///
/// Blank lines and lines starting with `#` pass through untouched. Every other line
/// is treated as a URI, segment or nested playlist alike, resolved against
/// `variant_url` and replaced with its proxied form. Output lines are joined with `\n`.
pub fn rewrite_variant(text: &str, variant_url: &str, referer: &str, proxy_prefix: &str) -> String {
    super::lines(text)
        .map(|line| {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                line.to_owned()
            } else {
                proxied_url(proxy_prefix, &resolve(variant_url, trimmed), referer)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
