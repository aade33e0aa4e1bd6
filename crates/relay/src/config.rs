use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/142.0.0.0 Safari/537.36";

pub const DEFAULT_REFERER: &str = "https://megaplay.buzz/";

pub const DEFAULT_PROXY_PREFIX: &str = "/watch-Beta/stream/proxy.php?url=";

/// Path under which the server exposes the cache root.
pub const DEFAULT_PUBLIC_PREFIX: &str = "stream_cache";

/// Configurable options for the relay engine
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Directory holding one sub-directory per cache key
    pub cache_root: PathBuf,

    /// How long a synthesized master stays fresh, measured from its mtime
    pub cache_ttl: Duration,

    /// Referer used when the caller supplies none or an unparsable one
    pub default_referer: String,

    /// Prepended to every rewritten segment reference
    pub proxy_prefix: String,

    /// Prefix of the manifest paths handed back to callers
    pub public_prefix: String,

    /// Per-request upstream timeout
    pub fetch_timeout: Duration,

    /// User agent sent upstream
    pub user_agent: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from(DEFAULT_PUBLIC_PREFIX),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            default_referer: DEFAULT_REFERER.to_owned(),
            proxy_prefix: DEFAULT_PROXY_PREFIX.to_owned(),
            public_prefix: DEFAULT_PUBLIC_PREFIX.to_owned(),
            fetch_timeout: Duration::from_secs(15),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

impl RelayConfig {
    /// Load relay config from environment variables, falling back to defaults.
    ///
    /// Supported env vars:
    /// - `RELAY_CACHE_DIR`
    /// - `RELAY_CACHE_TTL_SECS`
    /// - `RELAY_DEFAULT_REFERER`
    /// - `RELAY_PROXY_PREFIX`
    /// - `RELAY_FETCH_TIMEOUT_SECS`
    /// - `RELAY_USER_AGENT`
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = non_empty("RELAY_CACHE_DIR") {
            config.cache_root = PathBuf::from(dir);
        }

        if let Some(secs) = non_empty("RELAY_CACHE_TTL_SECS") {
            match secs.trim().parse::<u64>() {
                Ok(secs) => config.cache_ttl = Duration::from_secs(secs),
                Err(e) => warn!(value = %secs, error = %e, "Invalid RELAY_CACHE_TTL_SECS; keeping default"),
            }
        }

        if let Some(referer) = non_empty("RELAY_DEFAULT_REFERER") {
            match crate::request::normalize_referer(&referer) {
                Some(normalized) => config.default_referer = normalized,
                None => warn!(value = %referer, "Invalid RELAY_DEFAULT_REFERER; keeping default"),
            }
        }

        if let Some(prefix) = non_empty("RELAY_PROXY_PREFIX") {
            config.proxy_prefix = prefix;
        }

        if let Some(secs) = non_empty("RELAY_FETCH_TIMEOUT_SECS") {
            match secs.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.fetch_timeout = Duration::from_secs(secs),
                _ => warn!(value = %secs, "Invalid RELAY_FETCH_TIMEOUT_SECS; keeping default"),
            }
        }

        if let Some(user_agent) = non_empty("RELAY_USER_AGENT") {
            config.user_agent = user_agent;
        }

        config
    }

    pub fn with_cache_root(mut self, cache_root: impl Into<PathBuf>) -> Self {
        self.cache_root = cache_root.into();
        self
    }

    pub fn with_proxy_prefix(mut self, proxy_prefix: impl Into<String>) -> Self {
        self.proxy_prefix = proxy_prefix.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.cache_ttl, Duration::from_secs(86_400));
        assert_eq!(config.fetch_timeout, Duration::from_secs(15));
        assert_eq!(config.default_referer, "https://megaplay.buzz/");
        assert_eq!(config.public_prefix, "stream_cache");
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = RelayConfig::from_lookup(lookup_from(&[
            ("RELAY_CACHE_DIR", "/var/cache/relay"),
            ("RELAY_CACHE_TTL_SECS", "60"),
            ("RELAY_DEFAULT_REFERER", "https://example.com/watch?v=1"),
            ("RELAY_PROXY_PREFIX", "/proxy?u="),
        ]));
        assert_eq!(config.cache_root, PathBuf::from("/var/cache/relay"));
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.default_referer, "https://example.com/");
        assert_eq!(config.proxy_prefix, "/proxy?u=");
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = RelayConfig::from_lookup(lookup_from(&[
            ("RELAY_CACHE_TTL_SECS", "a day"),
            ("RELAY_DEFAULT_REFERER", "not a url"),
            ("RELAY_FETCH_TIMEOUT_SECS", "0"),
        ]));
        assert_eq!(config.cache_ttl, Duration::from_secs(86_400));
        assert_eq!(config.default_referer, DEFAULT_REFERER);
        assert_eq!(config.fetch_timeout, Duration::from_secs(15));
    }
}
