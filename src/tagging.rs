//! Audio metadata tagging utilities.
//!
//! This module embeds track metadata and cover art into downloaded files.
//! The embedder is chosen by the track's [`FormatKind`]: FLAC files get
//! Vorbis comments, MP4 files get iTunes-style `ilst` atoms.

use std::path::Path;

use bytes::Bytes;
use lofty::config::WriteOptions;
use lofty::file::{FileType, TaggedFileExt};
use lofty::picture::{MimeType, Picture, PictureType};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag, TagExt, TagType};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

use crate::error::EmbedError;
use crate::models::{FormatKind, Track};

/// Cover image bytes with their MIME type.
#[derive(Debug, Clone, PartialEq)]
pub struct Cover {
    pub data: Bytes,
    pub mime: String,
}

impl Cover {
    /// MIME type for the picture frame, from the header or magic bytes.
    fn mime_type(&self) -> MimeType {
        match self.mime.split(';').next().map(str::trim) {
            Some("image/png") => MimeType::Png,
            Some("image/jpeg") | Some("image/jpg") => MimeType::Jpeg,
            _ if self.data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) => MimeType::Png,
            // Assume JPEG
            _ => MimeType::Jpeg,
        }
    }
}

/// Writes tags into a downloaded file in place.
pub trait MetadataEmbedder: Send + Sync {
    /// Embed metadata for `track` into the file at `path`.
    ///
    /// Fails with [`EmbedError::InvalidFile`] when the file is not a
    /// well-formed container of the track's format.
    fn embed(&self, track: &Track, path: &Path, cover: Option<&Cover>) -> Result<(), EmbedError>;
}

/// Embedder backed by lofty, dispatching on [`FormatKind`].
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyEmbedder;

impl MetadataEmbedder for LoftyEmbedder {
    fn embed(&self, track: &Track, path: &Path, cover: Option<&Cover>) -> Result<(), EmbedError> {
        match track.format {
            FormatKind::Flac => {
                write_tags(path, track, cover, FileType::Flac, TagType::VorbisComments)
            }
            FormatKind::Mp4 => write_tags(path, track, cover, FileType::Mp4, TagType::Mp4Ilst),
        }
    }
}

fn write_tags(
    path: &Path,
    track: &Track,
    cover: Option<&Cover>,
    file_type: FileType,
    tag_type: TagType,
) -> Result<(), EmbedError> {
    debug!("Writing {:?} tags to: {}", tag_type, path.display());

    let invalid = |reason: String| EmbedError::InvalidFile {
        expected: track.format,
        reason,
    };

    let probe = Probe::open(path)?.guess_file_type()?;
    match probe.file_type() {
        Some(found) if found == file_type => {}
        Some(found) => return Err(invalid(format!("found {:?} data", found))),
        None => return Err(invalid("unrecognized data".to_string())),
    }
    let tagged_file = probe.read().map_err(|e| invalid(e.to_string()))?;

    let mut tag = tagged_file
        .tag(tag_type)
        .cloned()
        .unwrap_or_else(|| Tag::new(tag_type));

    tag.set_title(track.title.clone());
    tag.set_artist(track.artists_string(", "));
    tag.set_album(track.album.title.clone());
    if !track.album.artists.is_empty() {
        tag.insert_text(ItemKey::AlbumArtist, track.album.artists_string(", "));
    }
    tag.set_track(track.track_number);
    tag.set_disk(track.disc_number);

    if let Some(year) = track.album.year.filter(|y| *y > 0) {
        tag.set_year(year as u32);
    }

    if let Some(cover) = cover {
        tag.remove_picture_type(PictureType::CoverFront);
        tag.push_picture(Picture::new_unchecked(
            PictureType::CoverFront,
            Some(cover.mime_type()),
            None,
            cover.data.to_vec(),
        ));
    }

    tag.save_to_path(path, WriteOptions::default())?;
    debug!("Successfully wrote metadata to {}", path.display());

    Ok(())
}

/// Fetch a cover image.
pub async fn fetch_cover(client: &Client, url: &str) -> Result<Cover, reqwest::Error> {
    let response = client.get(url).send().await?.error_for_status()?;
    let mime = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let data = response.bytes().await?;

    Ok(Cover { data, mime })
}
