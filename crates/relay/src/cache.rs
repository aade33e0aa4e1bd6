//! On-disk playlist cache.
//!
//! Layout: `<root>/<key>/master.m3u8` plus one `<bandwidth-or-index>.m3u8` per variant.
//! The key is a SHA-256 digest of the target URL and normalized referer, so distinct
//! requests never share a directory. Freshness is judged from the master file's mtime;
//! stale entries are overwritten by the next store, never merged.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{RelayError, Result};
use crate::playlist::{STREAM_INF_TAG, parse_stream_entries};
use crate::request::StreamRequest;

pub const MASTER_FILE_NAME: &str = "master.m3u8";

/// A rewritten variant playlist waiting to be persisted.
#[derive(Debug, Clone)]
pub struct VariantPlaylist {
    /// Position of the variant in the upstream master playlist
    pub index: usize,
    pub bandwidth: Option<u64>,
    pub resolution: Option<String>,
    pub text: String,
}

/// A variant playlist that lives in a cache entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenVariant {
    pub bandwidth: Option<u64>,
    pub resolution: Option<String>,
    /// File name relative to the entry directory
    pub file_name: String,
    /// Absolute location on disk
    pub path: PathBuf,
}

/// A cache directory with its synthesized master playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub dir: PathBuf,
    pub master_path: PathBuf,
    pub variants: Vec<RewrittenVariant>,
}

/// Filesystem-backed cache of rewritten playlists.
#[derive(Debug, Clone)]
pub struct CacheManager {
    root: PathBuf,
    ttl: Duration,
}

impl CacheManager {
    pub fn new(root: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            root: root.into(),
            ttl,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Derives the cache key for a target URL and an already-normalized referer.
    pub fn key_for(target_url: &str, referer: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(target_url.as_bytes());
        hasher.update(b"|");
        hasher.update(referer.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn key_for_request(request: &StreamRequest) -> String {
        Self::key_for(request.target_url(), request.referer())
    }

    pub fn entry_dir(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Ensures the cache root exists.
    pub async fn init(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| RelayError::io("creating cache root", &self.root, e))
    }

    /// Returns the entry for `key` when its master playlist exists and is fresh.
    ///
    /// The variant list is read back from the master playlist, so it matches the
    /// set written by a single store. Listed files missing from disk are skipped.
    pub async fn lookup(&self, key: &str) -> Option<CacheEntry> {
        let dir = self.entry_dir(key);
        let master_path = dir.join(MASTER_FILE_NAME);

        let modified = match tokio::fs::metadata(&master_path)
            .await
            .and_then(|meta| meta.modified())
        {
            Ok(modified) => modified,
            Err(e) => {
                debug!(key, error = %e, "No cached master playlist");
                return None;
            }
        };

        // A modification time in the future counts as fresh.
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age >= self.ttl {
            debug!(key, age_secs = age.as_secs(), "Cached master playlist is stale");
            return None;
        }

        let master_text = match tokio::fs::read_to_string(&master_path).await {
            Ok(text) => text,
            Err(e) => {
                warn!(path = %master_path.display(), error = %e, "Failed to read cached master playlist");
                return None;
            }
        };

        let mut variants = Vec::new();
        for entry in parse_stream_entries(&master_text) {
            if !is_plain_file_name(&entry.uri) {
                warn!(key, uri = %entry.uri, "Ignoring unexpected URI in cached master playlist");
                continue;
            }

            let path = dir.join(&entry.uri);
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                warn!(path = %path.display(), "Cached variant playlist is missing");
                continue;
            }

            variants.push(RewrittenVariant {
                bandwidth: entry.bandwidth.filter(|bw| *bw > 0),
                resolution: entry.resolution,
                file_name: entry.uri,
                path,
            });
        }

        Some(CacheEntry {
            key: key.to_owned(),
            dir,
            master_path,
            variants,
        })
    }

    /// Writes variant playlists and a synthesized master for `key`.
    ///
    /// Variants keep their input order. The master is written last.
    pub async fn store(&self, key: &str, playlists: Vec<VariantPlaylist>) -> Result<CacheEntry> {
        let dir = self.entry_dir(key);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| RelayError::io("creating cache directory", &dir, e))?;

        let mut used_names = HashSet::new();
        let mut variants = Vec::with_capacity(playlists.len());

        for playlist in playlists {
            let bandwidth = playlist.bandwidth.filter(|bw| *bw > 0);
            let file_name = variant_file_name(bandwidth, playlist.index, &mut used_names);
            let path = dir.join(&file_name);

            write_atomic(&path, playlist.text.as_bytes(), "writing variant playlist").await?;

            variants.push(RewrittenVariant {
                bandwidth,
                resolution: playlist.resolution,
                file_name,
                path,
            });
        }

        let master_path = dir.join(MASTER_FILE_NAME);
        write_atomic(
            &master_path,
            synthesize_master(&variants).as_bytes(),
            "writing master playlist",
        )
        .await?;

        info!(key, variants = variants.len(), "Stored rewritten playlists");

        Ok(CacheEntry {
            key: key.to_owned(),
            dir,
            master_path,
            variants,
        })
    }
}

/// Renders the master playlist listing `variants` in order.
pub fn synthesize_master(variants: &[RewrittenVariant]) -> String {
    let mut out = String::from("#EXTM3U\n#EXT-X-VERSION:3\n");

    for variant in variants {
        out.push_str(STREAM_INF_TAG);
        out.push_str(&format!(":BANDWIDTH={}", variant.bandwidth.unwrap_or(0)));
        if let Some(resolution) = &variant.resolution {
            out.push_str(&format!(",RESOLUTION={resolution}"));
        }
        out.push('\n');
        out.push_str(&variant.file_name);
        out.push('\n');
    }

    out
}

fn variant_file_name(bandwidth: Option<u64>, index: usize, used: &mut HashSet<String>) -> String {
    let stem = match bandwidth {
        Some(bw) => bw.to_string(),
        None => format!("v{index}"),
    };

    let name = format!("{stem}.m3u8");
    if used.insert(name.clone()) {
        return name;
    }

    let name = format!("{stem}_{index}.m3u8");
    used.insert(name.clone());
    name
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != MASTER_FILE_NAME
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
}

/// Writes through a uniquely named temp file and renames it into place, so readers
/// and concurrent writers of the same key never observe a partial file.
async fn write_atomic(path: &Path, contents: &[u8], op: &'static str) -> Result<()> {
    static COUNTER: AtomicU64 = AtomicU64::new(0);

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("playlist");
    let tmp_path = path.with_file_name(format!(
        ".{file_name}.{}-{}.tmp",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    tokio::fs::write(&tmp_path, contents)
        .await
        .map_err(|e| RelayError::io(op, &tmp_path, e))?;

    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(RelayError::io(op, path, e));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist(index: usize, bandwidth: Option<u64>, resolution: Option<&str>) -> VariantPlaylist {
        VariantPlaylist {
            index,
            bandwidth,
            resolution: resolution.map(str::to_owned),
            text: format!("#EXTM3U\n#EXTINF:4,\nseg-{index}.ts"),
        }
    }

    #[test]
    fn key_is_deterministic_and_referer_sensitive() {
        let url = "https://cdn.example.com/master.m3u8";
        let a = CacheManager::key_for(url, "https://a.example.com/");
        assert_eq!(a, CacheManager::key_for(url, "https://a.example.com/"));
        assert_ne!(a, CacheManager::key_for(url, "https://b.example.com/"));
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn file_names_fall_back_to_index_and_disambiguate() {
        let mut used = HashSet::new();
        assert_eq!(variant_file_name(Some(800_000), 0, &mut used), "800000.m3u8");
        assert_eq!(variant_file_name(None, 1, &mut used), "v1.m3u8");
        assert_eq!(variant_file_name(Some(800_000), 2, &mut used), "800000_2.m3u8");
    }

    #[test]
    fn synthesized_master_lists_variants_in_order() {
        let variants = vec![
            RewrittenVariant {
                bandwidth: Some(2_560_000),
                resolution: Some("1280x720".into()),
                file_name: "2560000.m3u8".into(),
                path: PathBuf::from("/c/k/2560000.m3u8"),
            },
            RewrittenVariant {
                bandwidth: None,
                resolution: None,
                file_name: "v1.m3u8".into(),
                path: PathBuf::from("/c/k/v1.m3u8"),
            },
        ];

        assert_eq!(
            synthesize_master(&variants),
            "#EXTM3U\n#EXT-X-VERSION:3\n\
             #EXT-X-STREAM-INF:BANDWIDTH=2560000,RESOLUTION=1280x720\n2560000.m3u8\n\
             #EXT-X-STREAM-INF:BANDWIDTH=0\nv1.m3u8\n"
        );
    }

    #[test]
    fn synthesized_master_is_valid_hls() {
        let variants = vec![RewrittenVariant {
            bandwidth: Some(1_280_000),
            resolution: Some("640x360".into()),
            file_name: "1280000.m3u8".into(),
            path: PathBuf::from("/c/k/1280000.m3u8"),
        }];
        let text = synthesize_master(&variants);
        let parsed = m3u8_rs::parse_master_playlist_res(text.as_bytes()).unwrap();
        assert_eq!(parsed.variants.len(), 1);
        assert_eq!(parsed.variants[0].bandwidth, 1_280_000);
        assert_eq!(parsed.variants[0].uri, "1280000.m3u8");
    }

    #[tokio::test]
    async fn store_then_lookup_round_trips() {
        let temp = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(temp.path(), Duration::from_secs(3600));
        let key = CacheManager::key_for("https://cdn.example.com/m.m3u8", "https://example.com/");

        let stored = cache
            .store(
                &key,
                vec![
                    playlist(0, Some(1_280_000), Some("640x360")),
                    playlist(1, None, None),
                    playlist(2, Some(2_560_000), Some("1280x720")),
                ],
            )
            .await
            .unwrap();

        assert_eq!(stored.variants.len(), 3);
        assert!(stored.master_path.exists());
        let on_disk = std::fs::read_to_string(&stored.variants[0].path).unwrap();
        assert!(on_disk.contains("seg-0.ts"));

        let found = cache.lookup(&key).await.expect("fresh entry");
        assert_eq!(found, stored);
    }

    #[tokio::test]
    async fn store_leaves_no_temp_files() {
        let temp = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(temp.path(), Duration::from_secs(3600));
        let entry = cache.store("k", vec![playlist(0, Some(1), None)]).await.unwrap();

        let mut names: Vec<String> = std::fs::read_dir(&entry.dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["1.m3u8".to_string(), MASTER_FILE_NAME.to_string()]);
    }

    #[tokio::test]
    async fn lookup_misses_when_absent_or_stale() {
        let temp = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(temp.path(), Duration::from_secs(3600));
        assert!(cache.lookup("missing").await.is_none());

        let entry = cache.store("old", vec![playlist(0, Some(1), None)]).await.unwrap();
        let two_days_ago = SystemTime::now() - Duration::from_secs(2 * 24 * 60 * 60);
        std::fs::File::options()
            .write(true)
            .open(&entry.master_path)
            .unwrap()
            .set_modified(two_days_ago)
            .unwrap();
        assert!(cache.lookup("old").await.is_none());
    }

    #[tokio::test]
    async fn zero_ttl_is_always_stale() {
        let temp = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(temp.path(), Duration::ZERO);
        cache.store("k", vec![playlist(0, Some(1), None)]).await.unwrap();
        assert!(cache.lookup("k").await.is_none());
    }

    #[tokio::test]
    async fn restore_over_stale_entry_replaces_listing() {
        let temp = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(temp.path(), Duration::from_secs(3600));

        cache
            .store("k", vec![playlist(0, Some(1), None), playlist(1, Some(2), None)])
            .await
            .unwrap();
        cache.store("k", vec![playlist(0, Some(3), None)]).await.unwrap();

        let found = cache.lookup("k").await.unwrap();
        let names: Vec<&str> = found.variants.iter().map(|v| v.file_name.as_str()).collect();
        assert_eq!(names, vec!["3.m3u8"]);
    }

    #[tokio::test]
    async fn lookup_skips_listed_files_missing_on_disk() {
        let temp = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(temp.path(), Duration::from_secs(3600));
        let entry = cache
            .store("k", vec![playlist(0, Some(1), None), playlist(1, Some(2), None)])
            .await
            .unwrap();
        std::fs::remove_file(&entry.variants[0].path).unwrap();

        let found = cache.lookup("k").await.unwrap();
        assert_eq!(found.variants.len(), 1);
        assert_eq!(found.variants[0].file_name, "2.m3u8");
    }

    #[tokio::test]
    async fn store_is_idempotent_on_existing_directory() {
        let temp = tempfile::tempdir().unwrap();
        let cache = CacheManager::new(temp.path(), Duration::from_secs(3600));
        std::fs::create_dir_all(cache.entry_dir("k")).unwrap();
        assert!(cache.store("k", vec![playlist(0, Some(1), None)]).await.is_ok());
    }
}
