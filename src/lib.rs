//! # tideloader
//!
//! A Rust library for downloading tracks, albums and artist discographies
//! from TIDAL as tagged local files.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tideloader::api::{MediaSource, TidalClient};
//! use tideloader::config::{Config, Settings};
//! use tideloader::models::{Entity, MediaType};
//! use tideloader::reporter::ConsoleReporter;
//! use tideloader::Downloader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load(&Settings::default(), None)?;
//!     let client = TidalClient::new(&config)?;
//!     client.authenticate().await?;
//!
//!     let results = client.search("discovery", MediaType::Album, 1).await?;
//!     if let Some(Entity::Album(album)) = results.first() {
//!         let downloader =
//!             Downloader::new(&client, &config, &ConsoleReporter, reqwest::Client::new());
//!         let outcome = downloader.download_album(album, false, 0).await?;
//!         println!("Downloaded {} of {} tracks", outcome.downloaded(), outcome.total());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Layout
//!
//! Files land under the configured output directory as
//! `[artist]/[album]/[Disc N]/<NN title>.<flac|m4a>`. A file is only ever
//! visible under its final name once it has been fully downloaded,
//! decrypted and tagged, so re-running a download skips finished tracks.
//!
//! ## Low-Level APIs
//!
//! - [`api::MediaSource`] - catalog access, implemented by [`TidalClient`]
//! - [`crypto`] - payload decryption
//! - [`tagging`] - metadata embedding

pub mod api;
pub mod config;
pub mod converters;
pub mod crypto;
pub mod downloader;
pub mod error;
pub mod models;
pub mod paths;
pub mod reporter;
pub mod retry;
pub mod search;
pub mod tagging;

#[cfg(test)]
mod test_support;

// Main interface (recommended)
pub use downloader::{BatchOutcome, Downloader, TrackOutcome};

pub use api::{MediaSource, TidalClient};
pub use config::Config;
pub use error::{Error, Result};
pub use models::{Album, Artist, Entity, FormatKind, MediaType, Quality, Track};
