//! JSON to model converters.
//!
//! This module converts raw TIDAL API JSON responses into typed model
//! structures. Parsing is lenient about optional fields and strict about
//! identifiers.

use serde_json::Value;

use crate::api::SourceResult;
use crate::error::SourceError;
use crate::models::{Album, Artist, Quality, Track};

/// Base URL of TIDAL cover images.
const COVER_URL_BASE: &str = "https://resources.tidal.com/images";

/// Edge length of the cover image requested, in pixels.
const COVER_SIZE: u32 = 1280;

/// Get string from JSON, returning empty string if not found.
fn get_str(json: &Value, key: &str) -> String {
    json.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

/// Get string ID from JSON (handles both string and numeric IDs).
fn get_id(json: &Value, key: &str) -> Option<String> {
    match json.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn require_id(json: &Value, what: &str) -> SourceResult<String> {
    get_id(json, "id").ok_or_else(|| SourceError::Parse(format!("{} without an id", what)))
}

/// Get a 1-based position, defaulting to 1.
fn get_position(json: &Value, key: &str) -> u32 {
    json.get(key)
        .and_then(|v| v.as_u64())
        .filter(|n| *n > 0)
        .map(|n| n as u32)
        .unwrap_or(1)
}

/// Build the URL of an album cover from its image id.
///
/// TIDAL image ids are UUIDs whose dashes become path separators.
pub fn cover_url(image_id: &str) -> String {
    format!(
        "{}/{}/{}x{}.jpg",
        COVER_URL_BASE,
        image_id.replace('-', "/"),
        COVER_SIZE,
        COVER_SIZE
    )
}

/// Parse the year out of a `YYYY-MM-DD` release date.
pub fn parse_year(date: &str) -> Option<i32> {
    date.split('-').next()?.parse().ok()
}

/// Parse an artist.
pub fn parse_artist(json: &Value) -> SourceResult<Artist> {
    Ok(Artist {
        id: require_id(json, "artist")?,
        name: get_str(json, "name"),
    })
}

/// Parse an `artists` array, falling back to the single `artist` object.
fn parse_artists(json: &Value) -> SourceResult<Vec<Artist>> {
    match json.get("artists").and_then(|a| a.as_array()) {
        Some(artists) if !artists.is_empty() => artists.iter().map(parse_artist).collect(),
        _ => match json.get("artist") {
            Some(artist) if artist.is_object() => Ok(vec![parse_artist(artist)?]),
            _ => Ok(Vec::new()),
        },
    }
}

/// Parse an album.
pub fn parse_album(json: &Value) -> SourceResult<Album> {
    let year = json
        .get("releaseDate")
        .and_then(|d| d.as_str())
        .and_then(parse_year);
    let cover_url = json
        .get("cover")
        .and_then(|c| c.as_str())
        .filter(|c| !c.is_empty())
        .map(cover_url);

    Ok(Album {
        id: require_id(json, "album")?,
        title: get_str(json, "title"),
        year,
        cover_url,
        artists: parse_artists(json)?,
    })
}

/// Parse a track belonging to `album`.
///
/// The container is decided by the lower of the requested quality and the
/// best quality the catalog lists for the track. A `version` such as
/// "Remastered" is appended to the title in parentheses.
pub fn parse_track(json: &Value, album: &Album, requested: Quality) -> SourceResult<Track> {
    let title = get_str(json, "title");
    let title = match json.get("version").and_then(|v| v.as_str()) {
        Some(version) if !version.is_empty() => format!("{} ({})", title, version),
        _ => title,
    };

    let available = json
        .get("audioQuality")
        .and_then(|q| q.as_str())
        .and_then(Quality::from_api)
        .unwrap_or(requested);

    Ok(Track {
        id: require_id(json, "track")?,
        title,
        disc_number: get_position(json, "volumeNumber"),
        track_number: get_position(json, "trackNumber"),
        format: requested.min(available).format(),
        album: album.clone(),
        artists: parse_artists(json)?,
    })
}

/// Items of a paged listing.
pub fn page_items(json: &Value) -> SourceResult<&Vec<Value>> {
    json.get("items")
        .and_then(|i| i.as_array())
        .ok_or_else(|| SourceError::Parse("listing without items".to_string()))
}

/// Parse an error body into its sub-status and user-facing message.
pub fn parse_error(json: &Value) -> (Option<u64>, String) {
    let sub_status = json.get("subStatus").and_then(|s| s.as_u64());
    let message = json
        .get("userMessage")
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown error")
        .to_string();
    (sub_status, message)
}
