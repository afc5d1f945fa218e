use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub api_base_url: Option<String>,
    pub token_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub market: Option<String>,
    pub output_path: Option<String>,

    // Sections
    pub client: Option<ClientConfig>,
    pub collection: Option<CollectionConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ClientConfig {
    pub timeout_sec: Option<u64>,
    pub request_delay_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub initial_backoff_ms: Option<u64>,
    pub max_backoff_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
    // Paging
    pub page_size: Option<usize>,
    pub max_pages: Option<usize>,
    pub detail_batch_size: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CollectionConfig {
    /// "direct-search" or "artist-album-walk"
    pub strategy: Option<String>,
    pub limit_per_artist: Option<usize>,
    pub include_extended_fields: Option<bool>,
    pub max_albums_per_artist: Option<usize>,
    /// 0 leaves the bound open
    pub year_start: Option<i32>,
    pub year_end: Option<i32>,
    /// Any of "single", "album", "compilation", "appears_on"
    pub album_types: Option<Vec<String>>,
    /// Must contain `{artist}`
    pub search_query_template: Option<String>,
    pub max_concurrent_artists: Option<usize>,
    /// Fixed "YYYY-MM-DD" date ages are computed against, today when unset
    pub reference_date: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
