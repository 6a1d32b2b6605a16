//! Download orchestration.
//!
//! [`Downloader`] turns tracks, albums and discographies into tagged files
//! on disk. Every track goes through the same steps:
//!
//! 1. compute its final path and skip it if that file already exists;
//! 2. resolve a media URL, re-authenticating once on rate limiting;
//! 3. stream the payload to `<stem>.part.<ext>`;
//! 4. decrypt in place, then embed metadata;
//! 5. rename the temporary file to its final name.
//!
//! A final path therefore only ever names a complete file. Work is strictly
//! sequential.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::api::{Media, MediaSource};
use crate::config::Config;
use crate::error::{EmbedError, Error, Result, SourceError};
use crate::models::{Album, Artist, Track};
use crate::paths::{self, DownloadTarget};
use crate::reporter::Reporter;
use crate::retry::ReauthRetry;
use crate::tagging::{self, LoftyEmbedder, MetadataEmbedder};

/// How a single track download ended, when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackOutcome {
    /// The file was written to this path.
    Downloaded(PathBuf),
    /// A file was already present at this path.
    AlreadyExists(PathBuf),
    /// The account may not stream this track.
    Unavailable(PathBuf),
    /// The payload was not a valid container and was discarded.
    InvalidFile(PathBuf),
}

impl TrackOutcome {
    /// Final path of the track, whether or not it was written.
    pub fn path(&self) -> &Path {
        match self {
            TrackOutcome::Downloaded(path)
            | TrackOutcome::AlreadyExists(path)
            | TrackOutcome::Unavailable(path)
            | TrackOutcome::InvalidFile(path) => path,
        }
    }

    pub fn is_downloaded(&self) -> bool {
        matches!(self, TrackOutcome::Downloaded(_))
    }
}

/// Outcomes of an album or discography traversal, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub tracks: Vec<TrackOutcome>,
}

impl BatchOutcome {
    /// Number of tracks written by this run.
    pub fn downloaded(&self) -> usize {
        self.tracks.iter().filter(|t| t.is_downloaded()).count()
    }

    /// Number of tracks skipped for any reason.
    pub fn skipped(&self) -> usize {
        self.total() - self.downloaded()
    }

    /// Total number of tracks visited.
    pub fn total(&self) -> usize {
        self.tracks.len()
    }

    fn extend(&mut self, other: BatchOutcome) {
        self.tracks.extend(other.tracks);
    }
}

/// Sequential download engine.
///
/// Borrows every collaborator; nothing here owns session state.
pub struct Downloader<'a> {
    source: &'a dyn MediaSource,
    config: &'a Config,
    reporter: &'a dyn Reporter,
    embedder: &'a dyn MetadataEmbedder,
    http: Client,
}

impl<'a> Downloader<'a> {
    /// Create a downloader that tags files with [`LoftyEmbedder`].
    ///
    /// `http` is used for media payloads and cover images; it carries no
    /// catalog credentials.
    pub fn new(
        source: &'a dyn MediaSource,
        config: &'a Config,
        reporter: &'a dyn Reporter,
        http: Client,
    ) -> Self {
        Self {
            source,
            config,
            reporter,
            embedder: &LoftyEmbedder,
            http,
        }
    }

    /// Replace the metadata embedder.
    pub fn with_embedder(mut self, embedder: &'a dyn MetadataEmbedder) -> Self {
        self.embedder = embedder;
        self
    }

    /// Download one track.
    ///
    /// `siblings` is the full listing of the track's album, used for
    /// zero-padding. Skips are reported and returned as outcomes; every
    /// `Err` is fatal for the whole run.
    pub async fn download_track(
        &self,
        track: &Track,
        siblings: Option<&[Track]>,
        include_artist: bool,
        include_album: bool,
        indent: usize,
    ) -> Result<TrackOutcome> {
        let stem = paths::resolve_track_stem(
            self.source,
            self.config,
            track,
            siblings,
            include_artist,
            include_album,
        )
        .await?;
        let target = DownloadTarget::new(&stem, track.format);
        if self.already_exists(&target, indent).await? {
            return Ok(TrackOutcome::AlreadyExists(target.final_path));
        }

        let media = match self.resolve_media(track, indent).await? {
            Some(media) => media,
            None => {
                warn!("Track {} is not available to this account", track.id);
                self.reporter.skip(
                    indent,
                    &format!(
                        "Skipping download of {}; track is not available.",
                        target.file_name()
                    ),
                );
                return Ok(TrackOutcome::Unavailable(target.final_path));
            }
        };

        // The delivered container decides the extension and the tag format.
        let (track, target) = match media.format {
            Some(format) if format != track.format => {
                warn!(
                    "Track {} is delivered as {} instead of {}",
                    track.id, format, track.format
                );
                let target = DownloadTarget::new(&stem, format);
                if self.already_exists(&target, indent).await? {
                    return Ok(TrackOutcome::AlreadyExists(target.final_path));
                }
                let mut delivered = track.clone();
                delivered.format = format;
                (Cow::Owned(delivered), target)
            }
            _ => (Cow::Borrowed(track), target),
        };
        let name = target.file_name();

        if let Some(parent) = target.final_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        self.stream_to(&media.url, &target.temporary_path).await?;

        if let Some(decryptor) = &media.decryptor {
            self.reporter.step(indent, "Decrypting...");
            decryptor.decrypt(&target.temporary_path)?;
        }

        if !self.config.skip_metadata {
            match self.embed_metadata(&track, &target.temporary_path, indent).await {
                Ok(()) => {}
                Err(Error::Embed(EmbedError::InvalidFile { expected, reason })) => {
                    warn!(
                        "Discarding {}: not a valid {} file ({})",
                        target.temporary_path.display(),
                        expected,
                        reason
                    );
                    self.reporter
                        .skip(indent, &format!("Skipping {}; received invalid file", name));
                    fs::remove_file(&target.temporary_path).await?;
                    return Ok(TrackOutcome::InvalidFile(target.final_path));
                }
                Err(e) => return Err(e),
            }
        }

        fs::rename(&target.temporary_path, &target.final_path).await?;
        info!("Downloaded {}", target.final_path.display());

        Ok(TrackOutcome::Downloaded(target.final_path))
    }

    /// Download every track of an album, in listing order.
    pub async fn download_album(
        &self,
        album: &Album,
        include_artist: bool,
        indent: usize,
    ) -> Result<BatchOutcome> {
        let tracks = self.source.get_album_tracks(album).await?;
        let total = tracks.len();
        debug!("Album {} has {} track(s)", album.id, total);

        let mut outcome = BatchOutcome::default();
        for (index, track) in tracks.iter().enumerate() {
            self.reporter.step(
                indent,
                &format!(
                    "Downloading \"{}\" ({} of {} track(s))...",
                    track.title,
                    index + 1,
                    total
                ),
            );
            let result = self
                .download_track(track, Some(&tracks), include_artist, true, indent + 1)
                .await?;
            outcome.tracks.push(result);
        }

        Ok(outcome)
    }

    /// Download every album of an artist, in listing order.
    pub async fn download_discography(
        &self,
        artist: &Artist,
        indent: usize,
    ) -> Result<BatchOutcome> {
        let albums = self.source.get_artist_albums(artist).await?;
        let total = albums.len();
        debug!("Artist {} has {} album(s)", artist.id, total);

        let mut outcome = BatchOutcome::default();
        for (index, album) in albums.iter().enumerate() {
            self.reporter.step(
                indent,
                &format!(
                    "Downloading \"{}\" ({} of {} album(s))...",
                    album.title,
                    index + 1,
                    total
                ),
            );
            outcome.extend(self.download_album(album, true, indent + 1).await?);
        }

        Ok(outcome)
    }

    /// Report and return `true` when the final file is already present.
    async fn already_exists(&self, target: &DownloadTarget, indent: usize) -> Result<bool> {
        if !fs::try_exists(&target.final_path).await? {
            return Ok(false);
        }
        debug!("{} already exists", target.final_path.display());
        self.reporter.skip(
            indent,
            &format!(
                "Skipping download of {}; it already exists.",
                target.file_name()
            ),
        );
        Ok(true)
    }

    /// Resolve the media locator. `None` means the track is not entitled.
    async fn resolve_media(&self, track: &Track, indent: usize) -> Result<Option<Media>> {
        let mut retry = ReauthRetry::once();
        loop {
            match self.source.get_media(track).await {
                Ok(media) => return Ok(Some(media)),
                Err(SourceError::NotEntitled) => return Ok(None),
                Err(SourceError::RateLimited) if retry.try_acquire() => {
                    warn!("Rate limited resolving track {}, re-authenticating", track.id);
                    self.reporter
                        .step(indent, "Too many requests, logging out and back in...");
                    self.source.authenticate().await?;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Stream `url` into a fresh file at `path`.
    async fn stream_to(&self, url: &str, path: &Path) -> Result<()> {
        debug!("Fetching media into {}", path.display());
        let response = self.http.get(url).send().await?.error_for_status()?;

        let mut transfer = self.reporter.transfer(response.content_length());
        let mut file = fs::File::create(path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            transfer.advance(chunk.len() as u64);
        }
        file.flush().await?;
        transfer.finish();

        Ok(())
    }

    async fn embed_metadata(&self, track: &Track, path: &Path, indent: usize) -> Result<()> {
        self.reporter.step(indent, "Resolving metadata...");

        let cover = match &track.album.cover_url {
            Some(url) => Some(tagging::fetch_cover(&self.http, url).await?),
            None => None,
        };
        self.embedder.embed(track, path, cover.as_ref())?;

        Ok(())
    }
}
