//! Inbound request identity.

use url::Url;

/// A normalized relay request.
///
/// The referer is always in `scheme://host/` form; it feeds both the upstream
/// `Origin`/`Referer` headers and the cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    target_url: String,
    referer: String,
}

impl StreamRequest {
    /// Builds a request, substituting `default_referer` when `referer` is absent
    /// or cannot be parsed.
    pub fn new(target_url: impl Into<String>, referer: Option<&str>, default_referer: &str) -> Self {
        let referer = referer
            .and_then(normalize_referer)
            .unwrap_or_else(|| default_referer.to_owned());

        Self {
            target_url: target_url.into(),
            referer,
        }
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn referer(&self) -> &str {
        &self.referer
    }
}

/// Reduces a referer URL to `scheme://host/`.
///
/// Returns `None` for strings that do not parse or carry no host.
pub fn normalize_referer(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str().filter(|h| !h.is_empty())?;
    Some(format!("{}://{}/", url.scheme(), host))
}
