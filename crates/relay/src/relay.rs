//! Request orchestration: cache check, upstream fetch, rewrite, persist.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheEntry, CacheManager, VariantPlaylist};
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::fetch::{HttpFetcher, PlaylistFetcher};
use crate::playlist::{VariantDescriptor, parse_master, rewrite_variant};
use crate::request::StreamRequest;

/// One variant in a relay response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestVariant {
    pub bandwidth: Option<u64>,
    pub resolution: Option<String>,
    pub file: String,
}

/// Relay response: the synthesized master and its variants, as public paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub master: String,
    pub all: Vec<ManifestVariant>,
}

pub struct Relay {
    config: RelayConfig,
    cache: CacheManager,
    fetcher: Arc<dyn PlaylistFetcher>,
}

impl Relay {
    pub fn new(config: RelayConfig, fetcher: Arc<dyn PlaylistFetcher>) -> Self {
        let cache = CacheManager::new(config.cache_root.clone(), config.cache_ttl);
        Self {
            config,
            cache,
            fetcher,
        }
    }

    /// Builds a relay that fetches upstream over HTTP.
    pub fn with_http(config: RelayConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::new(config, Arc::new(fetcher)))
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    /// Handles a raw inbound request.
    pub async fn handle(&self, target_url: Option<&str>, referer: Option<&str>) -> Result<Manifest> {
        let target_url = target_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or(RelayError::MissingUrl)?;

        let request = StreamRequest::new(target_url, referer, &self.config.default_referer);
        self.process(&request).await
    }

    #[instrument(skip_all, fields(url = %request.target_url(), referer = %request.referer()))]
    pub async fn process(&self, request: &StreamRequest) -> Result<Manifest> {
        let key = CacheManager::key_for_request(request);

        if let Some(entry) = self.cache.lookup(&key).await {
            info!(key = %key, variants = entry.variants.len(), "Serving playlists from cache");
            return Ok(self.manifest(&entry));
        }

        let master_text = self
            .fetcher
            .fetch_text(request.target_url(), request.referer())
            .await
            .and_then(|text| require_body(request.target_url(), text))
            .map_err(|e| {
                warn!(error = %e, "Failed to load master playlist");
                RelayError::master_unavailable(request.target_url(), e)
            })?;

        let variants = parse_master(&master_text, request.target_url());
        if variants.is_empty() {
            warn!("Master playlist declares no streams");
            return Err(RelayError::NoStreams);
        }
        debug!(count = variants.len(), "Parsed master playlist");

        let declared = variants.len();
        let playlists = self.fetch_variants(variants, request.referer()).await;
        if playlists.is_empty() {
            warn!(declared, "No variant playlist could be loaded");
        }

        let entry = self.cache.store(&key, playlists).await?;
        Ok(self.manifest(&entry))
    }

    /// Fetches every variant concurrently and rewrites the ones that arrived.
    ///
    /// Results are slotted by declaration index, so the output keeps master order
    /// whatever the completion order was. Failed variants are dropped.
    async fn fetch_variants(
        &self,
        variants: Vec<VariantDescriptor>,
        referer: &str,
    ) -> Vec<VariantPlaylist> {
        let mut tasks = JoinSet::new();
        for (index, variant) in variants.iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let url = variant.source_url.clone();
            let referer = referer.to_owned();
            tasks.spawn(async move {
                let result = fetcher
                    .fetch_text(&url, &referer)
                    .await
                    .and_then(|text| require_body(&url, text));
                (index, result)
            });
        }

        let mut slots: Vec<Option<String>> = vec![None; variants.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(text))) => slots[index] = Some(text),
                Ok((index, Err(e))) => {
                    warn!(variant = %variants[index].source_url, error = %e, "Dropping variant");
                }
                Err(e) => warn!(error = %e, "Variant fetch task aborted"),
            }
        }

        variants
            .into_iter()
            .zip(slots)
            .enumerate()
            .filter_map(|(index, (variant, text))| {
                let text = text?;
                Some(VariantPlaylist {
                    index,
                    text: rewrite_variant(
                        &text,
                        &variant.source_url,
                        referer,
                        &self.config.proxy_prefix,
                    ),
                    bandwidth: variant.bandwidth,
                    resolution: variant.resolution,
                })
            })
            .collect()
    }

    fn manifest(&self, entry: &CacheEntry) -> Manifest {
        let prefix = self.config.public_prefix.trim_end_matches('/');
        let public_path = |file: &str| {
            if prefix.is_empty() {
                format!("{}/{file}", entry.key)
            } else {
                format!("{prefix}/{}/{file}", entry.key)
            }
        };

        Manifest {
            master: public_path(crate::cache::MASTER_FILE_NAME),
            all: entry
                .variants
                .iter()
                .map(|v| ManifestVariant {
                    bandwidth: v.bandwidth,
                    resolution: v.resolution.clone(),
                    file: public_path(&v.file_name),
                })
                .collect(),
        }
    }
}

/// A blank upstream answer counts as a failed fetch.
fn require_body(url: &str, text: String) -> Result<String> {
    if text.trim().is_empty() {
        return Err(RelayError::EmptyBody {
            url: url.to_owned(),
        });
    }
    Ok(text)
}
