//! Data models for catalog entities.
//!
//! Tracks, albums and artists are immutable values produced fresh by each
//! listing call of a [`MediaSource`](crate::api::MediaSource).

pub mod album;
pub mod artist;
pub mod common;
pub mod track;

// Re-exports for convenience
pub use album::Album;
pub use artist::Artist;
pub use common::{Entity, FormatKind, MediaType, Quality, UnknownFormat};
pub use track::Track;
