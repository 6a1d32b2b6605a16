//! Fixtures shared by unit tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::api::{Media, MediaSource, SourceResult};
use crate::config::{Config, NamingStyle};
use crate::crypto::Decrypt;
use crate::error::{CryptoError, EmbedError, SourceError};
use crate::models::{Album, Artist, Entity, FormatKind, MediaType, Track};
use crate::reporter::{indented, NoTransfer, Reporter, Transfer};
use crate::tagging::{Cover, MetadataEmbedder};

pub const XOR_KEY: u8 = 0x5A;

pub fn album(id: &str, title: &str) -> Album {
    Album {
        id: id.to_string(),
        title: title.to_string(),
        year: None,
        cover_url: None,
        artists: vec![Artist::new("ar1", "Artist")],
    }
}

pub fn track(id: &str, title: &str, disc: u32, number: u32, album: &Album) -> Track {
    Track {
        id: id.to_string(),
        title: title.to_string(),
        disc_number: disc,
        track_number: number,
        album: album.clone(),
        artists: album.artists.clone(),
        ..Default::default()
    }
}

/// Quiet, plain-named config rooted at `root` that skips tagging.
pub fn config_in(root: &Path) -> Config {
    Config {
        output_directory: root.to_path_buf(),
        naming: NamingStyle::Plain,
        quiet: true,
        skip_metadata: true,
        ..Default::default()
    }
}

pub fn xor(data: &[u8]) -> Vec<u8> {
    data.iter().map(|b| b ^ XOR_KEY).collect()
}

/// Next answer of [`ScriptedSource::get_media`].
pub enum MediaReply {
    /// Plain media at the default URL.
    Plain,
    /// XOR-encrypted media at the default URL, counting decrypt calls.
    Encrypted(Arc<AtomicUsize>),
    /// Plain media delivered in the given container.
    Delivered(FormatKind),
    RateLimited,
    NotEntitled,
}

#[derive(Debug, Default)]
pub struct Calls {
    pub authenticate: AtomicUsize,
    pub search: AtomicUsize,
    pub album_tracks: AtomicUsize,
    pub artist_albums: AtomicUsize,
    pub get_media: AtomicUsize,
}

impl Calls {
    pub fn total(&self) -> usize {
        [
            &self.authenticate,
            &self.search,
            &self.album_tracks,
            &self.artist_albums,
            &self.get_media,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

/// In-memory catalog with a scripted queue of media replies.
///
/// Media URLs default to `{media_base}/media/{track id}`.
pub struct ScriptedSource {
    media_base: String,
    albums: HashMap<String, Vec<Track>>,
    artists: HashMap<String, Vec<Album>>,
    results: Vec<Entity>,
    replies: Mutex<VecDeque<MediaReply>>,
    pub calls: Calls,
}

impl ScriptedSource {
    pub fn new(media_base: &str) -> Self {
        Self {
            media_base: media_base.to_string(),
            albums: HashMap::new(),
            artists: HashMap::new(),
            results: Vec::new(),
            replies: Mutex::new(VecDeque::new()),
            calls: Calls::default(),
        }
    }

    pub fn with_album(mut self, album: &Album, tracks: Vec<Track>) -> Self {
        self.albums.insert(album.id.clone(), tracks);
        self
    }

    pub fn with_artist(mut self, artist: &Artist, albums: Vec<Album>) -> Self {
        self.artists.insert(artist.id.clone(), albums);
        self
    }

    pub fn with_results(mut self, results: Vec<Entity>) -> Self {
        self.results = results;
        self
    }

    pub fn with_replies(self, replies: Vec<MediaReply>) -> Self {
        *self.replies.lock().unwrap() = replies.into();
        self
    }

    pub fn media_url(&self, track: &Track) -> String {
        format!("{}/media/{}", self.media_base, track.id)
    }
}

#[async_trait]
impl MediaSource for ScriptedSource {
    async fn authenticate(&self) -> SourceResult<()> {
        self.calls.authenticate.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn search(
        &self,
        _query: &str,
        media_type: MediaType,
        limit: u32,
    ) -> SourceResult<Vec<Entity>> {
        self.calls.search.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .results
            .iter()
            .filter(|e| e.media_type() == media_type)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get_album_tracks(&self, album: &Album) -> SourceResult<Vec<Track>> {
        self.calls.album_tracks.fetch_add(1, Ordering::SeqCst);
        self.albums.get(&album.id).cloned().ok_or(SourceError::Status {
            status: 404,
            sub_status: None,
            message: format!("album {} not found", album.id),
        })
    }

    async fn get_artist_albums(&self, artist: &Artist) -> SourceResult<Vec<Album>> {
        self.calls.artist_albums.fetch_add(1, Ordering::SeqCst);
        Ok(self.artists.get(&artist.id).cloned().unwrap_or_default())
    }

    async fn get_media(&self, track: &Track) -> SourceResult<Media> {
        self.calls.get_media.fetch_add(1, Ordering::SeqCst);
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or(MediaReply::Plain);
        match reply {
            MediaReply::Plain => Ok(Media::plain(self.media_url(track))),
            MediaReply::Encrypted(calls) => Ok(Media::encrypted(
                self.media_url(track),
                Box::new(XorDecryptor { calls }),
            )),
            MediaReply::Delivered(format) => {
                Ok(Media::plain(self.media_url(track)).with_format(format))
            }
            MediaReply::RateLimited => Err(SourceError::RateLimited),
            MediaReply::NotEntitled => Err(SourceError::NotEntitled),
        }
    }
}

pub struct XorDecryptor {
    calls: Arc<AtomicUsize>,
}

impl Decrypt for XorDecryptor {
    fn decrypt(&self, path: &Path) -> Result<(), CryptoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let data = std::fs::read(path)?;
        std::fs::write(path, xor(&data))?;
        Ok(())
    }
}

/// Records every line it is given, with indentation applied.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    pub lines: Mutex<Vec<String>>,
    pub skips: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn skips(&self) -> Vec<String> {
        self.skips.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn step(&self, indent: usize, message: &str) {
        self.lines.lock().unwrap().push(indented(indent, message));
    }

    fn skip(&self, indent: usize, message: &str) {
        let line = indented(indent, message);
        self.skips.lock().unwrap().push(message.to_string());
        self.lines.lock().unwrap().push(line);
    }

    fn transfer(&self, _total: Option<u64>) -> Box<dyn Transfer> {
        Box::new(NoTransfer)
    }
}

/// Embedder that rejects chosen track ids and records what it saw.
#[derive(Debug, Default)]
pub struct FakeEmbedder {
    invalid: HashSet<String>,
    pub embedded: Mutex<Vec<(String, PathBuf)>>,
    pub formats: Mutex<Vec<FormatKind>>,
    pub covers: Mutex<Vec<Cover>>,
}

impl FakeEmbedder {
    pub fn rejecting(ids: &[&str]) -> Self {
        Self {
            invalid: ids.iter().map(|id| id.to_string()).collect(),
            ..Default::default()
        }
    }
}

impl MetadataEmbedder for FakeEmbedder {
    fn embed(&self, track: &Track, path: &Path, cover: Option<&Cover>) -> Result<(), EmbedError> {
        if self.invalid.contains(&track.id) {
            return Err(EmbedError::InvalidFile {
                expected: track.format,
                reason: "scripted".to_string(),
            });
        }
        assert!(path.is_file(), "embedding into a missing file");
        self.embedded
            .lock()
            .unwrap()
            .push((track.id.clone(), path.to_path_buf()));
        self.formats.lock().unwrap().push(track.format);
        if let Some(cover) = cover {
            self.covers.lock().unwrap().push(cover.clone());
        }
        Ok(())
    }
}
