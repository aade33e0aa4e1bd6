//! Master playlist scanning: extracts `#EXT-X-STREAM-INF` variants and their URIs.

use serde::{Deserialize, Serialize};

use crate::resolver::resolve;

pub const STREAM_INF_TAG: &str = "#EXT-X-STREAM-INF";

/// A variant stream as declared in a master playlist, with its URI left as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    pub bandwidth: Option<u64>,
    pub resolution: Option<String>,
    pub uri: String,
}

/// A variant stream with an absolute source URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDescriptor {
    pub bandwidth: Option<u64>,
    pub resolution: Option<String>,
    pub source_url: String,
}

/// Scans master playlist text for stream-information tags.
///
/// Each tag takes the next non-blank line as its URI. A trailing tag with no URI
/// is dropped.
pub fn parse_stream_entries(text: &str) -> Vec<StreamEntry> {
    let lines: Vec<&str> = super::lines(text).map(str::trim).collect();
    let mut entries = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        let Some(attrs) = line.strip_prefix(STREAM_INF_TAG) else {
            continue;
        };
        let attrs = attrs.strip_prefix(':').unwrap_or(attrs);
        let (bandwidth, resolution) = parse_stream_inf_attributes(attrs);

        let Some(uri) = lines[idx + 1..].iter().find(|l| !l.is_empty()) else {
            continue;
        };

        entries.push(StreamEntry {
            bandwidth,
            resolution,
            uri: (*uri).to_owned(),
        });
    }

    entries
}

/// Parses a master playlist into variants whose URLs are resolved against `base_url`.
pub fn parse_master(text: &str, base_url: &str) -> Vec<VariantDescriptor> {
    parse_stream_entries(text)
        .into_iter()
        .map(|entry| VariantDescriptor {
            bandwidth: entry.bandwidth,
            resolution: entry.resolution,
            source_url: resolve(base_url, &entry.uri),
        })
        .collect()
}

fn parse_stream_inf_attributes(attrs: &str) -> (Option<u64>, Option<String>) {
    let mut bandwidth = None;
    let mut resolution = None;

    for part in attrs.split(',').map(str::trim) {
        if let Some(value) = part.strip_prefix("BANDWIDTH=") {
            bandwidth = value.trim().parse::<u64>().ok();
        } else if let Some(value) = part.strip_prefix("RESOLUTION=") {
            let value = value.trim();
            if !value.is_empty() {
                resolution = Some(value.to_owned());
            }
        }
    }

    (bandwidth, resolution)
}
