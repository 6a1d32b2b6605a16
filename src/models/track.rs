//! Track model.

use serde::{Deserialize, Serialize};

use super::album::Album;
use super::artist::{join_names, Artist};
use super::common::FormatKind;

/// A full track record, including the album it belongs to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    /// Catalog identifier.
    pub id: String,

    /// Track title.
    pub title: String,

    /// Disc number (1-indexed).
    #[serde(default = "default_one")]
    pub disc_number: u32,

    /// Track number on the disc (1-indexed).
    #[serde(default = "default_one")]
    pub track_number: u32,

    /// Container the track will be stored in.
    #[serde(default)]
    pub format: FormatKind,

    /// Album containing this track.
    pub album: Album,

    /// Artists who performed this track.
    #[serde(default)]
    pub artists: Vec<Artist>,
}

fn default_one() -> u32 {
    1
}

impl Track {
    /// Get the primary artist name.
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(|a| a.name.as_str())
    }

    /// Get all artist names joined by a separator.
    pub fn artists_string(&self, separator: &str) -> String {
        join_names(&self.artists, separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_artists_string() {
        let track = Track {
            artists: vec![Artist::new("1", "Artist One"), Artist::new("2", "Artist Two")],
            ..Default::default()
        };
        assert_eq!(track.artists_string(", "), "Artist One, Artist Two");
        assert_eq!(track.primary_artist(), Some("Artist One"));
    }

    #[test]
    fn test_track_numbers_default_to_one() {
        let json = r#"{"id":"7","title":"x","album":{"id":"1","title":"a"}}"#;
        let track: Track = serde_json::from_str(json).unwrap();
        assert_eq!(track.disc_number, 1);
        assert_eq!(track.track_number, 1);
        assert_eq!(track.format, FormatKind::Flac);
    }
}
