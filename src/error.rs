//! Error types.
//!
//! Each layer has its own enum so callers can match on the conditions that
//! matter to them ([`SourceError::RateLimited`], [`EmbedError::InvalidFile`]).
//! Everything converges into [`Error`] at the traversal boundary.

use std::path::PathBuf;

use thiserror::Error;

use crate::models::{FormatKind, UnknownFormat};

/// Errors reported by a media source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Too many requests; the session should be refreshed.
    #[error("Too many requests")]
    RateLimited,

    /// The track is not licensed for this account or region.
    #[error("Track is not available for this account")]
    NotEntitled,

    /// Login was rejected. Carries the service's user-facing message.
    #[error("Authentication failed: {message}")]
    Auth { message: String },

    /// A request was attempted before `authenticate` succeeded.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Any other non-success response from the API.
    #[error("API error (status {status}): {message}")]
    Status {
        status: u16,
        sub_status: Option<u64>,
        message: String,
    },

    /// HTTP request failed.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The response did not have the expected shape.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The stream uses a container we cannot store.
    #[error(transparent)]
    UnknownFormat(#[from] UnknownFormat),
}

/// Errors raised while decrypting a payload.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The security token could not be decoded or unwrapped.
    #[error("Invalid security token: {0}")]
    InvalidToken(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while embedding metadata.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// The file is not a well-formed container of the expected kind.
    #[error("Invalid {expected} file: {reason}")]
    InvalidFile { expected: FormatKind, reason: String },

    /// Reading or writing tags failed.
    #[error("Tag error: {0}")]
    Tag(#[from] lofty::error::LoftyError),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Failed to write config file {0}: {1}")]
    Write(PathBuf, #[source] std::io::Error),
}

/// Main error type for download operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Source(#[from] SourceError),

    /// Decryption failed.
    #[error("Decryption failed: {0}")]
    Crypto(#[from] CryptoError),

    /// Metadata embedding failed.
    #[error("Metadata error: {0}")]
    Embed(#[from] EmbedError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Fetching a payload or cover image failed.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A search returned nothing.
    #[error("No results found.")]
    NoResults,

    /// The user dismissed the selection prompt.
    #[error("")]
    Declined,

    /// The selection prompt could not be shown.
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// The process received an interrupt. Exits non-zero without a message.
    #[error("")]
    Interrupted,
}

impl Error {
    /// Soft conditions end the process quietly with a neutral exit code.
    pub fn is_soft(&self) -> bool {
        matches!(self, Error::Declined)
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        if self.is_soft() {
            0
        } else {
            1
        }
    }
}

/// Result type alias for download operations.
pub type Result<T> = std::result::Result<T, Error>;
