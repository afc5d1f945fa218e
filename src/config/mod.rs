mod file_config;

pub use file_config::{ClientConfig, CollectionConfig, FileConfig};

use crate::catalog::{AlbumType, YearRange};
use crate::catalog_api::ClientCredentials;
use crate::collector::{CollectionStrategy, PaginationSettings};
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Largest page and batch size the catalog accepts.
const CATALOG_MAX_PAGE_SIZE: usize = 50;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub api_base_url: String,
    pub token_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub market: Option<String>,
    pub output_path: PathBuf,
    pub timeout_sec: u64,
    pub request_delay_ms: u64,
    pub strategy: CollectionStrategy,
    pub limit_per_artist: usize,
    pub include_extended_fields: bool,
    pub max_concurrent_artists: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            client_id: None,
            client_secret: None,
            market: None,
            output_path: PathBuf::from("tracks.csv"),
            timeout_sec: 30,
            request_delay_ms: 150,
            strategy: CollectionStrategy::default(),
            limit_per_artist: 20,
            include_extended_fields: false,
            max_concurrent_artists: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub api_base_url: String,
    pub token_url: String,
    pub credentials: ClientCredentials,
    pub market: Option<String>,
    pub output_path: PathBuf,

    pub client: ClientSettings,
    pub collection: CollectionSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let api_base_url = file
            .api_base_url
            .unwrap_or_else(|| cli.api_base_url.clone());
        if api_base_url.trim().is_empty() {
            bail!("api_base_url must not be empty");
        }
        let token_url = file.token_url.unwrap_or_else(|| cli.token_url.clone());
        if token_url.trim().is_empty() {
            bail!("token_url must not be empty");
        }

        let client_id = file
            .client_id
            .or_else(|| cli.client_id.clone())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "client_id must be specified via --client-id, CATALOG_CLIENT_ID or in config file"
                )
            })?;
        let client_secret = file
            .client_secret
            .or_else(|| cli.client_secret.clone())
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "client_secret must be specified via --client-secret, CATALOG_CLIENT_SECRET or in config file"
                )
            })?;

        let market = file
            .market
            .or_else(|| cli.market.clone())
            .filter(|m| !m.trim().is_empty());
        let output_path = file
            .output_path
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.output_path.clone());

        // Client settings - merge [client] section with CLI and defaults
        let client_file = file.client.unwrap_or_default();
        let client_defaults = ClientSettings::default();
        let client = ClientSettings {
            timeout_sec: client_file.timeout_sec.unwrap_or(cli.timeout_sec),
            request_delay_ms: client_file
                .request_delay_ms
                .unwrap_or(cli.request_delay_ms),
            max_retries: client_file
                .max_retries
                .unwrap_or(client_defaults.max_retries),
            initial_backoff_ms: client_file
                .initial_backoff_ms
                .unwrap_or(client_defaults.initial_backoff_ms),
            max_backoff_ms: client_file
                .max_backoff_ms
                .unwrap_or(client_defaults.max_backoff_ms),
            backoff_multiplier: client_file
                .backoff_multiplier
                .unwrap_or(client_defaults.backoff_multiplier),
        };
        if client.timeout_sec == 0 {
            bail!("timeout_sec must be greater than zero");
        }
        if !client.backoff_multiplier.is_finite() || client.backoff_multiplier < 1.0 {
            bail!(
                "backoff_multiplier must be at least 1.0, got {}",
                client.backoff_multiplier
            );
        }

        let page_size = client_file.page_size.unwrap_or(CATALOG_MAX_PAGE_SIZE);
        let detail_batch_size = client_file
            .detail_batch_size
            .unwrap_or(CATALOG_MAX_PAGE_SIZE);
        if page_size == 0 || page_size > CATALOG_MAX_PAGE_SIZE {
            bail!(
                "page_size must be between 1 and {}, got {}",
                CATALOG_MAX_PAGE_SIZE,
                page_size
            );
        }
        if detail_batch_size == 0 || detail_batch_size > CATALOG_MAX_PAGE_SIZE {
            bail!(
                "detail_batch_size must be between 1 and {}, got {}",
                CATALOG_MAX_PAGE_SIZE,
                detail_batch_size
            );
        }
        let max_pages = client_file
            .max_pages
            .unwrap_or(PaginationSettings::default().max_pages);
        if max_pages == 0 {
            bail!("max_pages must be greater than zero");
        }
        let pagination = PaginationSettings {
            page_size,
            max_pages,
        };

        // Collection settings - merge [collection] section with CLI and defaults
        let collection_file = file.collection.unwrap_or_default();
        let collection_defaults = CollectionSettings::default();

        let strategy = match collection_file.strategy {
            Some(s) => parse_strategy(&s)?,
            None => cli.strategy,
        };
        let album_types = match collection_file.album_types {
            Some(types) => parse_album_types(&types)?,
            None => collection_defaults.album_types.clone(),
        };
        let year_range = YearRange::new(
            year_bound(collection_file.year_start, collection_defaults.year_range.start),
            year_bound(collection_file.year_end, collection_defaults.year_range.end),
        );
        if let (Some(start), Some(end)) = (year_range.start, year_range.end) {
            if start > end {
                bail!("year_start ({}) is after year_end ({})", start, end);
            }
        }
        let search_query_template = collection_file
            .search_query_template
            .unwrap_or(collection_defaults.search_query_template);
        if !search_query_template.contains("{artist}") {
            bail!(
                "search_query_template must contain {{artist}}, got {:?}",
                search_query_template
            );
        }
        let reference_date = collection_file
            .reference_date
            .map(|raw| {
                NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .with_context(|| format!("Invalid reference_date: {:?}", raw))
            })
            .transpose()?;

        let collection = CollectionSettings {
            strategy,
            limit_per_artist: collection_file
                .limit_per_artist
                .unwrap_or(cli.limit_per_artist),
            include_extended_fields: collection_file
                .include_extended_fields
                .unwrap_or(cli.include_extended_fields),
            max_albums_per_artist: collection_file
                .max_albums_per_artist
                .unwrap_or(collection_defaults.max_albums_per_artist),
            year_range,
            album_types,
            search_query_template,
            max_concurrent_artists: collection_file
                .max_concurrent_artists
                .unwrap_or(cli.max_concurrent_artists),
            pagination,
            detail_batch_size,
            reference_date,
        };
        if collection.limit_per_artist == 0 {
            bail!("limit_per_artist must be greater than zero");
        }
        if collection.max_concurrent_artists == 0 {
            bail!("max_concurrent_artists must be greater than zero");
        }

        Ok(Self {
            api_base_url,
            token_url,
            credentials: ClientCredentials {
                client_id,
                client_secret,
            },
            market,
            output_path,
            client,
            collection,
        })
    }
}

/// Transport and retry settings of the catalog client.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub timeout_sec: u64,
    /// Minimum delay between two consecutive catalog requests
    pub request_delay_ms: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_sec: 30,
            request_delay_ms: 150,
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectionSettings {
    pub strategy: CollectionStrategy,
    pub limit_per_artist: usize,
    pub include_extended_fields: bool,
    pub max_albums_per_artist: usize,
    pub year_range: YearRange,
    pub album_types: Vec<AlbumType>,
    pub search_query_template: String,
    pub max_concurrent_artists: usize,
    pub pagination: PaginationSettings,
    pub detail_batch_size: usize,
    /// Fixed date for age computation; today when `None`
    pub reference_date: Option<NaiveDate>,
}

impl Default for CollectionSettings {
    fn default() -> Self {
        Self {
            strategy: CollectionStrategy::default(),
            limit_per_artist: 20,
            include_extended_fields: false,
            max_albums_per_artist: 20,
            year_range: YearRange::new(Some(2010), None),
            album_types: AlbumType::ALL.to_vec(),
            search_query_template: "artist:\"{artist}\"".to_string(),
            max_concurrent_artists: 1,
            pagination: PaginationSettings::default(),
            detail_batch_size: CATALOG_MAX_PAGE_SIZE,
            reference_date: None,
        }
    }
}

/// A configured year of 0 leaves the bound open; an absent one keeps the default.
fn year_bound(configured: Option<i32>, default: Option<i32>) -> Option<i32> {
    match configured {
        Some(0) => None,
        Some(year) => Some(year),
        None => default,
    }
}

/// Parses a strategy name using clap's ValueEnum trait.
fn parse_strategy(s: &str) -> Result<CollectionStrategy> {
    CollectionStrategy::from_str(s, true)
        .map_err(|_| anyhow::anyhow!("Unknown collection strategy: {:?}", s))
}

fn parse_album_types(values: &[String]) -> Result<Vec<AlbumType>> {
    let mut types = Vec::with_capacity(values.len());
    for value in values {
        let Some(album_type) = AlbumType::parse(value) else {
            bail!("Unknown album type: {:?}", value);
        };
        if !types.contains(&album_type) {
            types.push(album_type);
        }
    }
    if types.is_empty() {
        bail!("album_types must list at least one album type");
    }
    Ok(types)
}
