//! Common types shared across all models.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Album, Artist, Track};

/// Container format of a downloaded track.
///
/// This is a closed set: every variant maps to exactly one metadata
/// embedder and one file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    /// FLAC (lossless and hi-res streams).
    #[default]
    Flac,
    /// AAC in an MP4 container.
    Mp4,
}

/// A format tag that does not name a known container.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown file format: {0}")]
pub struct UnknownFormat(pub String);

impl FormatKind {
    /// File extension, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FormatKind::Flac => "flac",
            FormatKind::Mp4 => "m4a",
        }
    }

    /// Map a TIDAL codec name (`FLAC`, `AAC`, `MQA`, ...) to a container.
    pub fn from_codec(codec: &str) -> Result<Self, UnknownFormat> {
        match codec.to_ascii_uppercase().as_str() {
            "FLAC" | "MQA" | "ALAC" => Ok(FormatKind::Flac),
            "AAC" | "MP4A" | "MP4A.40.2" | "MP4A.40.5" => Ok(FormatKind::Mp4),
            _ => Err(UnknownFormat(codec.to_string())),
        }
    }
}

impl FromStr for FormatKind {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flac" => Ok(FormatKind::Flac),
            "mp4" | "m4a" => Ok(FormatKind::Mp4),
            _ => Err(UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatKind::Flac => f.write_str("FLAC"),
            FormatKind::Mp4 => f.write_str("MP4"),
        }
    }
}

/// Audio quality options.
///
/// Ordered from lowest to highest so the effective quality of a track is
/// the minimum of what was requested and what the catalog offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Quality {
    /// AAC 96 kbps.
    Low,
    /// AAC 320 kbps.
    High,
    /// FLAC 16-bit/44.1 kHz.
    #[default]
    Lossless,
    /// MQA / hi-res FLAC.
    HiRes,
}

impl Quality {
    /// Get the `soundQuality` value for the TIDAL API.
    pub fn api_name(&self) -> &'static str {
        match self {
            Quality::Low => "LOW",
            Quality::High => "HIGH",
            Quality::Lossless => "LOSSLESS",
            Quality::HiRes => "HI_RES",
        }
    }

    /// Parse an `audioQuality` value returned by the TIDAL API.
    pub fn from_api(name: &str) -> Option<Self> {
        match name {
            "LOW" => Some(Quality::Low),
            "HIGH" => Some(Quality::High),
            "LOSSLESS" => Some(Quality::Lossless),
            "HI_RES" | "HI_RES_LOSSLESS" => Some(Quality::HiRes),
            _ => None,
        }
    }

    /// Container a stream of this quality arrives in.
    pub fn format(&self) -> FormatKind {
        match self {
            Quality::Low | Quality::High => FormatKind::Mp4,
            Quality::Lossless | Quality::HiRes => FormatKind::Flac,
        }
    }
}

/// Kind of entity a search should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Track,
    Album,
    Artist,
}

impl MediaType {
    /// Path segment used by the TIDAL search endpoint.
    pub fn search_endpoint(&self) -> &'static str {
        match self {
            MediaType::Track => "search/tracks",
            MediaType::Album => "search/albums",
            MediaType::Artist => "search/artists",
        }
    }
}

/// A search result: one track, album or artist.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Track(Track),
    Album(Album),
    Artist(Artist),
}

impl Entity {
    /// Display name of the entity.
    pub fn name(&self) -> &str {
        match self {
            Entity::Track(track) => &track.title,
            Entity::Album(album) => &album.title,
            Entity::Artist(artist) => &artist.name,
        }
    }

    /// The kind of this entity.
    pub fn media_type(&self) -> MediaType {
        match self {
            Entity::Track(_) => MediaType::Track,
            Entity::Album(_) => MediaType::Album,
            Entity::Artist(_) => MediaType::Artist,
        }
    }
}
