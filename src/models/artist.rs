//! Artist model.

use serde::{Deserialize, Serialize};

/// An artist as listed by the catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Artist {
    /// Catalog identifier.
    pub id: String,

    /// Display name.
    pub name: String,
}

impl Artist {
    /// Create a new artist.
    pub fn new<S1: Into<String>, S2: Into<String>>(id: S1, name: S2) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Join artist names with a separator.
pub fn join_names(artists: &[Artist], separator: &str) -> String {
    artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}
