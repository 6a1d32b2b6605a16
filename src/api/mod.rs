//! Catalog access.
//!
//! The download engine talks to the catalog only through [`MediaSource`].
//! [`TidalClient`] is the production implementation.

use std::fmt;

use async_trait::async_trait;

use crate::crypto::Decrypt;
use crate::error::SourceError;
use crate::models::{Album, Artist, Entity, FormatKind, MediaType, Track};

pub mod tidal;

pub use tidal::TidalClient;

/// Result type alias for media source calls.
pub type SourceResult<T> = std::result::Result<T, SourceError>;

/// A resolved, time-limited media locator.
pub struct Media {
    /// Address of the payload.
    pub url: String,
    /// Present when the payload is encrypted.
    pub decryptor: Option<Box<dyn Decrypt>>,
    /// Container the payload is actually delivered in, when the catalog
    /// says so. Overrides the format the track was listed with.
    pub format: Option<FormatKind>,
}

impl Media {
    /// A plaintext payload.
    pub fn plain<S: Into<String>>(url: S) -> Self {
        Self {
            url: url.into(),
            decryptor: None,
            format: None,
        }
    }

    /// An encrypted payload with its decryption step.
    pub fn encrypted<S: Into<String>>(url: S, decryptor: Box<dyn Decrypt>) -> Self {
        Self {
            url: url.into(),
            decryptor: Some(decryptor),
            format: None,
        }
    }

    /// Record the container the payload is delivered in.
    pub fn with_format(mut self, format: FormatKind) -> Self {
        self.format = Some(format);
        self
    }
}

impl fmt::Debug for Media {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Media")
            .field("url", &self.url)
            .field("encrypted", &self.decryptor.is_some())
            .field("format", &self.format)
            .finish()
    }
}

/// Everything the download engine needs from a catalog.
///
/// Listings are returned in catalog order; callers must not re-sort them.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Establish (or refresh) the session.
    async fn authenticate(&self) -> SourceResult<()>;

    /// Search the catalog for up to `limit` entities of one kind.
    async fn search(&self, query: &str, media_type: MediaType, limit: u32)
        -> SourceResult<Vec<Entity>>;

    /// Ordered track listing of an album.
    async fn get_album_tracks(&self, album: &Album) -> SourceResult<Vec<Track>>;

    /// Ordered album listing of an artist.
    async fn get_artist_albums(&self, artist: &Artist) -> SourceResult<Vec<Album>>;

    /// Resolve a track to its media locator.
    ///
    /// Fails with [`SourceError::RateLimited`] or [`SourceError::NotEntitled`]
    /// when those conditions apply, never with a generic status error.
    async fn get_media(&self, track: &Track) -> SourceResult<Media>;
}
