//! HTTP client for the remote catalog Web API.

use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::debug;

use super::wire::{ApiAlbum, ApiPaging, ArtistSearchResponse, TrackSearchResponse, TracksResponse};
use super::{CatalogApi, CatalogError, Page};
use crate::catalog::{AlbumRecord, AlbumType, ArtistRef, TrackRecord};

/// Tokens are refreshed this long before the catalog says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Client-credentials pair for the catalog's token endpoint.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

struct AccessToken {
    value: String,
    refresh_at: Instant,
}

/// HTTP client for the catalog Web API.
///
/// Handles the client-credentials token and maps HTTP failures onto
/// [`CatalogError`]. It performs no retries and no pacing of its own, wrap it
/// in a [`super::ResilientCatalog`] for that.
pub struct WebCatalogClient {
    client: Client,
    base_url: String,
    token_url: String,
    credentials: ClientCredentials,
    token: Mutex<Option<AccessToken>>,
}

impl WebCatalogClient {
    /// Create a new catalog client.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the Web API (e.g., "https://api.spotify.com/v1")
    /// * `token_url` - Client-credentials token endpoint
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(
        base_url: String,
        token_url: String,
        credentials: ClientCredentials,
        timeout_sec: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()?;

        // Ensure base_url doesn't have trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            token_url,
            credentials,
            token: Mutex::new(None),
        })
    }

    /// Get the base URL of the catalog API.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn access_token(&self) -> Result<String, CatalogError> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref() {
            if Instant::now() < current.refresh_at {
                return Ok(current.value.clone());
            }
        }

        debug!("Requesting catalog access token from {}", self.token_url);
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
            .send()
            .await
            .map_err(CatalogError::from_transport)?;

        if !response.status().is_success() {
            return Err(match error_for_status(response).await {
                CatalogError::Rejected { status, message } => {
                    CatalogError::Auth(format!("token request failed ({}): {}", status, message))
                }
                other => other,
            });
        }

        let body: TokenResponse = response.json().await.map_err(CatalogError::from_transport)?;
        let lifetime = Duration::from_secs(body.expires_in.unwrap_or(3600));
        let refresh_at = Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN);
        let value = body.access_token.clone();
        *token = Some(AccessToken {
            value: body.access_token,
            refresh_at,
        });
        Ok(value)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        let token = self.access_token().await?;
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(CatalogError::from_transport)?;

        if !response.status().is_success() {
            let err = error_for_status(response).await;
            if matches!(err, CatalogError::Auth(_)) {
                // force a fresh token on the next call
                self.token.lock().await.take();
            }
            return Err(err);
        }

        response.json::<T>().await.map_err(CatalogError::from_transport)
    }
}

async fn error_for_status(response: Response) -> CatalogError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let url = response.url().to_string();
    let message = response.text().await.unwrap_or_default();

    match status {
        StatusCode::TOO_MANY_REQUESTS => CatalogError::RateLimited { retry_after },
        StatusCode::UNAUTHORIZED => CatalogError::Auth(message),
        StatusCode::NOT_FOUND => CatalogError::NotFound(url),
        s if s.is_server_error() => CatalogError::Transient(format!("{} from {}", s, url)),
        s => CatalogError::Rejected {
            status: s.as_u16(),
            message,
        },
    }
}

fn market_param(market: Option<&str>) -> String {
    market
        .map(|m| format!("&market={}", urlencoding::encode(m)))
        .unwrap_or_default()
}

#[async_trait]
impl CatalogApi for WebCatalogClient {
    async fn search_artist(&self, name: &str) -> Result<Option<ArtistRef>, CatalogError> {
        let url = format!(
            "{}/search?q={}&type=artist&limit=1",
            self.base_url,
            urlencoding::encode(name)
        );
        let response: ArtistSearchResponse = self.get_json(&url).await?;
        Ok(response
            .artists
            .items
            .first()
            .and_then(|artist| artist.to_artist_ref()))
    }

    async fn search_tracks(
        &self,
        query: &str,
        market: Option<&str>,
        page_size: usize,
        offset: usize,
    ) -> Result<Page<TrackRecord>, CatalogError> {
        let url = format!(
            "{}/search?q={}&type=track&limit={}&offset={}{}",
            self.base_url,
            urlencoding::encode(query),
            page_size,
            offset,
            market_param(market)
        );
        let response: TrackSearchResponse = self.get_json(&url).await?;
        let has_more = response.tracks.has_more();
        let items = response
            .tracks
            .items
            .iter()
            .filter_map(|track| track.to_track_record())
            .collect();
        Ok(Page::new(items, has_more))
    }

    async fn list_albums(
        &self,
        artist_id: &str,
        album_type: AlbumType,
        market: Option<&str>,
        page_size: usize,
        offset: usize,
    ) -> Result<Page<AlbumRecord>, CatalogError> {
        let url = format!(
            "{}/artists/{}/albums?include_groups={}&limit={}&offset={}{}",
            self.base_url,
            urlencoding::encode(artist_id),
            album_type.as_api_str(),
            page_size,
            offset,
            market_param(market)
        );
        let response: ApiPaging<ApiAlbum> = self.get_json(&url).await?;
        let has_more = response.has_more();
        let items = response
            .items
            .iter()
            .filter_map(|album| album.to_album_record(artist_id))
            .collect();
        Ok(Page::new(items, has_more))
    }

    async fn list_tracks(
        &self,
        album_id: &str,
        page_size: usize,
        offset: usize,
    ) -> Result<Page<String>, CatalogError> {
        let url = format!(
            "{}/albums/{}/tracks?limit={}&offset={}",
            self.base_url,
            urlencoding::encode(album_id),
            page_size,
            offset
        );
        let response: ApiPaging<super::wire::ApiTrack> = self.get_json(&url).await?;
        let has_more = response.has_more();
        let items = response
            .items
            .iter()
            .filter_map(|track| track.id().map(str::to_string))
            .collect();
        Ok(Page::new(items, has_more))
    }

    async fn get_track_details(
        &self,
        ids: &[String],
        market: Option<&str>,
    ) -> Result<Vec<Option<TrackRecord>>, CatalogError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let url = format!(
            "{}/tracks?ids={}{}",
            self.base_url,
            urlencoding::encode(&ids.join(",")),
            market_param(market)
        );
        let response: TracksResponse = self.get_json(&url).await?;
        Ok(response
            .tracks
            .iter()
            .map(|track| track.as_ref().and_then(|t| t.to_track_record()))
            .collect())
    }
}
