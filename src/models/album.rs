//! Album model.

use serde::{Deserialize, Serialize};

use super::artist::{join_names, Artist};

/// An album record.
///
/// Tracks are not stored here; they are listed on demand through the
/// media source so every traversal sees a fresh, ordered listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Album {
    /// Catalog identifier.
    pub id: String,

    /// Album title.
    pub title: String,

    /// Release year, if known.
    #[serde(default)]
    pub year: Option<i32>,

    /// URL of the front cover image, if the album has one.
    #[serde(default)]
    pub cover_url: Option<String>,

    /// Album artists. The primary artist comes first.
    #[serde(default)]
    pub artists: Vec<Artist>,
}

impl Album {
    /// Get the primary artist.
    pub fn primary_artist(&self) -> Option<&Artist> {
        self.artists.first()
    }

    /// Get all artist names joined by a separator.
    pub fn artists_string(&self, separator: &str) -> String {
        join_names(&self.artists, separator)
    }
}
