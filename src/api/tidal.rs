//! TIDAL API client.
//!
//! This module provides a [`MediaSource`] backed by the TIDAL v1 API
//! (api.tidalhifi.com). Every call except login requires a session, which
//! [`TidalClient::authenticate`] establishes and can refresh at any time.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{Media, MediaSource, SourceResult};
use crate::config::Config;
use crate::converters;
use crate::crypto::TidalDecryptor;
use crate::error::SourceError;
use crate::models::{Album, Artist, Entity, FormatKind, MediaType, Quality, Track};

/// Base URL for the TIDAL API.
pub const API_URL: &str = "https://api.tidalhifi.com/v1";

/// Largest page the API hands out for listings.
const PAGE_SIZE: usize = 100;

/// Sub-status TIDAL pairs with 401 for tracks the account may not stream.
const NOT_ENTITLED_SUB_STATUS: u64 = 4005;

const USER_AGENT: &str = concat!("tideloader/", env!("CARGO_PKG_VERSION"));

/// State returned by a successful login.
#[derive(Debug, Clone)]
struct Session {
    session_id: String,
    country_code: String,
    user_id: String,
}

/// TIDAL API client.
///
/// Cloning is cheap and clones share the session and album cache.
///
/// # Example
///
/// ```rust,no_run
/// use tideloader::api::{MediaSource, TidalClient};
/// use tideloader::config::Config;
/// use tideloader::models::MediaType;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = TidalClient::new(&Config::default())?;
///     client.authenticate().await?;
///     let results = client.search("daft punk", MediaType::Album, 5).await?;
///     println!("{} album(s)", results.len());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct TidalClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    api_token: String,
    quality: Quality,
    session: Arc<RwLock<Option<Session>>>,
    /// Cache for album data to avoid redundant requests.
    album_cache: Arc<RwLock<HashMap<String, Album>>>,
}

impl TidalClient {
    /// Create a client for the account and quality in `config`.
    ///
    /// No request is made until [`authenticate`](MediaSource::authenticate).
    pub fn new(config: &Config) -> SourceResult<Self> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            client,
            base_url: API_URL.to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            api_token: config.api_token.clone(),
            quality: config.quality,
            session: Arc::new(RwLock::new(None)),
            album_cache: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Point the client at another API root.
    pub fn with_base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// Make an authenticated GET request.
    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> SourceResult<Value> {
        let session = self
            .session
            .read()
            .await
            .clone()
            .ok_or(SourceError::NotAuthenticated)?;

        let url = self.url(endpoint);
        debug!("GET {} with params: {:?}", url, params);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("sessionId", session.session_id.as_str()),
                ("countryCode", session.country_code.as_str()),
            ])
            .query(params)
            .send()
            .await?;

        read_json(response).await
    }

    /// Collect up to `limit` items of a paged listing, or all of them.
    async fn get_paged(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        limit: Option<usize>,
    ) -> SourceResult<Vec<Value>> {
        let mut items = Vec::new();
        if limit == Some(0) {
            return Ok(items);
        }

        loop {
            let wanted = match limit {
                Some(limit) => (limit - items.len()).min(PAGE_SIZE),
                None => PAGE_SIZE,
            };
            let mut page_params = params.to_vec();
            page_params.push(("limit", wanted.to_string()));
            page_params.push(("offset", items.len().to_string()));

            let page = self.get(endpoint, &page_params).await?;
            let page_items = converters::page_items(&page)?;
            let total = page
                .get("totalNumberOfItems")
                .and_then(|t| t.as_u64())
                .map(|t| t as usize);

            if page_items.is_empty() {
                break;
            }
            items.extend(page_items.iter().cloned());

            let exhausted = total.map_or(true, |total| items.len() >= total);
            let satisfied = limit.is_some_and(|limit| items.len() >= limit);
            if exhausted || satisfied {
                break;
            }
        }

        if let Some(limit) = limit {
            items.truncate(limit);
        }
        Ok(items)
    }

    /// Get an album by ID, from the cache when possible.
    async fn get_album(&self, album_id: &str) -> SourceResult<Album> {
        let cached = {
            let cache = self.album_cache.read().await;
            cache.get(album_id).cloned()
        };
        if let Some(album) = cached {
            return Ok(album);
        }

        let json = self.get(&format!("albums/{}", album_id), &[]).await?;
        let album = converters::parse_album(&json)?;
        self.cache_album(&album).await;
        Ok(album)
    }

    async fn cache_album(&self, album: &Album) {
        let mut cache = self.album_cache.write().await;
        cache.insert(album.id.clone(), album.clone());
    }

    /// Parse a track listed outside of its album, fetching the album.
    async fn parse_loose_track(&self, json: &Value) -> SourceResult<Track> {
        let album_id = json
            .get("album")
            .and_then(|a| a.get("id"))
            .and_then(|id| match id {
                Value::Number(n) => Some(n.to_string()),
                Value::String(s) => Some(s.clone()),
                _ => None,
            })
            .ok_or_else(|| SourceError::Parse("track without an album".to_string()))?;
        let album = self.get_album(&album_id).await?;
        converters::parse_track(json, &album, self.quality)
    }
}

/// Turn a response into JSON, mapping failures onto [`SourceError`].
async fn read_json(response: Response) -> SourceResult<Value> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SourceError::RateLimited);
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    let (sub_status, message) = converters::parse_error(&body);
    if status == StatusCode::UNAUTHORIZED && sub_status == Some(NOT_ENTITLED_SUB_STATUS) {
        return Err(SourceError::NotEntitled);
    }

    warn!("TIDAL API error {} ({:?}): {}", status, sub_status, message);
    Err(SourceError::Status {
        status: status.as_u16(),
        sub_status,
        message,
    })
}

fn required_str(json: &Value, key: &str) -> SourceResult<String> {
    json.get(key)
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .ok_or_else(|| SourceError::Parse(format!("missing {}", key)))
}

#[async_trait]
impl MediaSource for TidalClient {
    /// Log in with username and password, replacing any previous session.
    async fn authenticate(&self) -> SourceResult<()> {
        let url = self.url("login/username");
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header("X-Tidal-Token", &self.api_token)
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let (_, message) = converters::parse_error(&body);
            return Err(SourceError::Auth { message });
        }
        let json = read_json(response).await?;

        let session = Session {
            session_id: required_str(&json, "sessionId")?,
            country_code: required_str(&json, "countryCode")?,
            user_id: required_str(&json, "userId")?,
        };
        info!(
            "TIDAL session established. User ID: {}, country: {}",
            session.user_id, session.country_code
        );
        *self.session.write().await = Some(session);

        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        media_type: MediaType,
        limit: u32,
    ) -> SourceResult<Vec<Entity>> {
        let params = [("query", query.to_string())];
        let items = self
            .get_paged(media_type.search_endpoint(), &params, Some(limit as usize))
            .await?;

        let mut results = Vec::with_capacity(items.len());
        for item in &items {
            let entity = match media_type {
                MediaType::Track => Entity::Track(self.parse_loose_track(item).await?),
                MediaType::Album => {
                    let album = converters::parse_album(item)?;
                    self.cache_album(&album).await;
                    Entity::Album(album)
                }
                MediaType::Artist => Entity::Artist(converters::parse_artist(item)?),
            };
            results.push(entity);
        }

        debug!("Search for {:?} returned {} result(s)", query, results.len());
        Ok(results)
    }

    async fn get_album_tracks(&self, album: &Album) -> SourceResult<Vec<Track>> {
        let items = self
            .get_paged(&format!("albums/{}/tracks", album.id), &[], None)
            .await?;
        items
            .iter()
            .map(|item| converters::parse_track(item, album, self.quality))
            .collect()
    }

    async fn get_artist_albums(&self, artist: &Artist) -> SourceResult<Vec<Album>> {
        let items = self
            .get_paged(&format!("artists/{}/albums", artist.id), &[], None)
            .await?;

        let mut albums = Vec::with_capacity(items.len());
        for item in &items {
            let album = converters::parse_album(item)?;
            self.cache_album(&album).await;
            albums.push(album);
        }
        Ok(albums)
    }

    async fn get_media(&self, track: &Track) -> SourceResult<Media> {
        let params = [("soundQuality", self.quality.api_name().to_string())];
        let json = self
            .get(&format!("tracks/{}/streamUrl", track.id), &params)
            .await?;

        let url = required_str(&json, "url")?;
        let format = match json.get("codec").and_then(|c| c.as_str()) {
            Some(codec) => Some(FormatKind::from_codec(codec)?),
            None => None,
        };
        if let Some(format) = format.filter(|format| *format != track.format) {
            debug!(
                "Track {} streams as {} but was listed as {}",
                track.id, format, track.format
            );
        }

        let media = match json.get("encryptionKey").and_then(|k| k.as_str()) {
            Some(key) if !key.is_empty() => {
                Media::encrypted(url, Box::new(TidalDecryptor::new(key)))
            }
            _ => Media::plain(url),
        };
        Ok(match format {
            Some(format) => media.with_format(format),
            None => media,
        })
    }
}
