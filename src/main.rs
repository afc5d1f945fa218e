use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog_collector::catalog_api::{CatalogApi, ResilientCatalog, RetryPolicy, WebCatalogClient};
use catalog_collector::collector::{CollectionEngine, CollectionQuery, CollectionStrategy};
use catalog_collector::config::{self, DEFAULT_API_BASE_URL, DEFAULT_TOKEN_URL};
use catalog_collector::export::export_csv;
use catalog_collector::metrics::{
    apply_min_popularity, cohort_matrix, group_diagnostics, residuals, sort_records,
    summarize_groups, Metric, SortKey,
};

/// Rows shown on each side of the residual ranking.
const RESIDUAL_TOP_K: usize = 5;

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    if path_buf.is_absolute() {
        return Ok(path_buf);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(path_buf))
}

#[derive(Parser, Debug)]
#[clap(version = concat!(env!("CARGO_PKG_VERSION"), "-", env!("GIT_HASH")))]
struct CliArgs {
    /// Artist names to collect tracks for.
    pub artists: Vec<String>,

    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// How tracks are gathered for each artist.
    #[clap(long, value_enum, default_value_t = CollectionStrategy::default())]
    pub strategy: CollectionStrategy,

    /// Maximum number of tracks per artist.
    #[clap(short, long, default_value_t = 20)]
    pub limit: usize,

    /// Market (ISO 3166-1 alpha-2 country code) to collect for.
    #[clap(long)]
    pub market: Option<String>,

    /// Also collect isrc, disc/track numbers and album size.
    #[clap(long)]
    pub extended: bool,

    /// Collect tracks for a free search query (e.g. genre:"k-pop") instead of artists.
    #[clap(long, conflicts_with = "artists")]
    pub keyword: Option<String>,

    /// Number of tracks to collect for --keyword.
    #[clap(long, default_value_t = 100, requires = "keyword")]
    pub total: usize,

    /// Path of the exported CSV file.
    #[clap(short, long, value_parser = parse_path, default_value = "tracks.csv")]
    pub output: PathBuf,

    /// Drop tracks below this popularity before exporting.
    #[clap(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub min_popularity: u8,

    /// Order of the exported rows.
    #[clap(long, value_enum, default_value = "staying-index")]
    pub sort_by: SortKey,

    /// Number of artists collected concurrently.
    #[clap(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Minimum delay between two catalog requests, in milliseconds.
    #[clap(long, default_value_t = 150)]
    pub request_delay_ms: u64,

    /// Timeout in seconds for catalog requests.
    #[clap(long, default_value_t = 30)]
    pub timeout_sec: u64,

    /// Base URL of the catalog Web API.
    #[clap(long, default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: String,

    /// Client-credentials token endpoint.
    #[clap(long, default_value = DEFAULT_TOKEN_URL)]
    pub token_url: String,

    /// Client id of the catalog application.
    #[clap(long, env = "CATALOG_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Client secret of the catalog application.
    #[clap(long, env = "CATALOG_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Do not prefix the CSV with a UTF-8 byte order mark.
    #[clap(long)]
    pub no_bom: bool,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            api_base_url: args.api_base_url.clone(),
            token_url: args.token_url.clone(),
            client_id: args.client_id.clone(),
            client_secret: args.client_secret.clone(),
            market: args.market.clone(),
            output_path: args.output.clone(),
            timeout_sec: args.timeout_sec,
            request_delay_ms: args.request_delay_ms,
            strategy: args.strategy,
            limit_per_artist: args.limit,
            include_extended_fields: args.extended,
            max_concurrent_artists: args.concurrency,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    info!(
        "catalog-collector {}-{}",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    if cli_args.artists.is_empty() && cli_args.keyword.is_none() {
        bail!("Nothing to collect: pass at least one artist or --keyword");
    }

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    #[allow(unused_mut)]
    let mut app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    #[cfg(feature = "slowdown")]
    {
        app_config.client.request_delay_ms *= 2;
        warn!("slowdown enabled, request delay doubled");
    }

    info!("Configuration loaded:");
    info!("  api_base_url: {}", app_config.api_base_url);
    info!("  market: {:?}", app_config.market);
    info!("  output_path: {:?}", app_config.output_path);
    info!("  request_delay_ms: {}", app_config.client.request_delay_ms);
    info!("  max_retries: {}", app_config.client.max_retries);
    info!("  strategy: {:?}", app_config.collection.strategy);
    info!(
        "  limit_per_artist: {}",
        app_config.collection.limit_per_artist
    );

    let client = WebCatalogClient::new(
        app_config.api_base_url.clone(),
        app_config.token_url.clone(),
        app_config.credentials.clone(),
        app_config.client.timeout_sec,
    )
    .context("Failed to create catalog client")?;
    let catalog: Arc<dyn CatalogApi> = Arc::new(ResilientCatalog::new(
        client,
        Duration::from_millis(app_config.client.request_delay_ms),
        RetryPolicy::new(&app_config.client),
    ));

    let engine = CollectionEngine::new(catalog, app_config.collection.clone());
    let market = app_config.market.clone();

    let result = match &cli_args.keyword {
        Some(keyword) => {
            engine
                .collect_keyword(keyword, cli_args.total, market.as_deref())
                .await
        }
        None => {
            let query = CollectionQuery::new(cli_args.artists.iter())
                .limit_per_artist(app_config.collection.limit_per_artist)
                .market(market)
                .include_extended_fields(app_config.collection.include_extended_fields)
                .strategy(app_config.collection.strategy);
            engine.collect(&query).await
        }
    };

    let summary = result.report.summary();
    info!(
        "Collected {} tracks: {} artists collected, {} failed, {} skipped, {} albums skipped",
        result.tracks.len(),
        summary.collected,
        summary.failed,
        summary.skipped,
        summary.skipped_albums
    );
    for (artist, err) in result.report.failures() {
        warn!("Artist {:?} failed: {}", artist, err);
    }
    if result.tracks.is_empty() && result.report.is_partial_failure() {
        bail!("No tracks collected, every requested artist failed");
    }

    log_diagnostics(&result.tracks);

    let mut tracks = apply_min_popularity(result.tracks.clone(), cli_args.min_popularity);
    sort_records(&mut tracks, cli_args.sort_by);
    if tracks.len() < result.tracks.len() {
        info!(
            "Dropped {} tracks below popularity {}",
            result.tracks.len() - tracks.len(),
            cli_args.min_popularity
        );
    }

    let rows = export_csv(&app_config.output_path, &tracks, !cli_args.no_bom)?;
    info!("Done: {} rows in {:?}", rows, app_config.output_path);

    Ok(())
}

fn log_diagnostics(tracks: &[catalog_collector::EnrichedTrackRecord]) {
    info!("Age vs popularity per artist:");
    for diagnostic in group_diagnostics(tracks, Metric::AgeYears, Metric::Popularity) {
        match diagnostic.fit {
            Some(fit) => info!(
                "  {}: n={} slope={:.2} r={}",
                diagnostic.group,
                diagnostic.n,
                fit.slope,
                fit.correlation
                    .map(|r| format!("{:.3}", r))
                    .unwrap_or_else(|| "-".to_string())
            ),
            None => info!("  {}: n={} (not enough data)", diagnostic.group, diagnostic.n),
        }
    }

    for group in summarize_groups(tracks) {
        info!(
            "  {}: {} tracks, popularity {:?}, age {:?}y, staying index {:?}, explicit {}%, collab {}%",
            group.group,
            group.tracks,
            group.mean_popularity,
            group.mean_age_years,
            group.mean_staying_index,
            group.explicit_rate,
            group.collab_rate
        );
    }

    for cell in cohort_matrix(tracks) {
        debug!(
            "  cohort {} {}: {} tracks, mean popularity {:?}",
            cell.group,
            cell.bucket,
            cell.tracks,
            cell.mean_popularity
        );
    }

    let analysis = residuals(tracks, Metric::AgeYears, Metric::Popularity);
    if analysis.fit.is_some() {
        info!("Tracks outperforming their age:");
        for row in analysis.top_over(RESIDUAL_TOP_K) {
            info!(
                "  {} - {} ({:+.2})",
                row.main_artist,
                row.track_name,
                row.residual.unwrap_or_default()
            );
        }
        info!("Tracks underperforming their age:");
        for row in analysis.top_under(RESIDUAL_TOP_K) {
            info!(
                "  {} - {} ({:+.2})",
                row.main_artist,
                row.track_name,
                row.residual.unwrap_or_default()
            );
        }
    }
}
