//! Search and selection.
//!
//! Turns a free-text query into one catalog entity, either by taking the
//! first hit or by asking the user to pick from labelled results.

use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use tracing::debug;

use crate::api::MediaSource;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{Entity, MediaType};
use crate::reporter::{Reporter, INDENT};

/// Picks one of several labelled options.
pub trait Chooser: Send + Sync {
    /// Returns the chosen index, or `None` if the user declined.
    fn choose(&self, prompt: &str, labels: &[String]) -> Result<Option<usize>>;
}

/// Interactive terminal list.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalChooser;

impl Chooser for TerminalChooser {
    fn choose(&self, prompt: &str, labels: &[String]) -> Result<Option<usize>> {
        Select::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(labels)
            .default(0)
            .interact_opt()
            .map_err(|e| Error::Prompt(e.to_string()))
    }
}

/// Human-readable, possibly multi-line label of a search result.
pub fn label(entity: &Entity) -> String {
    let indent = format!("{}   ", INDENT);
    match entity {
        Entity::Track(track) => {
            let album = match track.album.year {
                Some(year) => format!("{} ({})", track.album.title, year),
                None => track.album.title.clone(),
            };
            format!(
                "{}\n{}{}\n{}{}",
                track.title,
                indent,
                track.artists_string(", "),
                indent,
                album
            )
        }
        Entity::Album(album) => {
            let name = match album.year {
                Some(year) => format!("{} ({})", album.title, year),
                None => album.title.clone(),
            };
            format!("{}\n{}{}", name, indent, album.artists_string(", "))
        }
        Entity::Artist(artist) => artist.name.clone(),
    }
}

/// Search the catalog and settle on one entity.
pub async fn search(
    source: &dyn MediaSource,
    config: &Config,
    reporter: &dyn Reporter,
    chooser: &dyn Chooser,
    media_type: MediaType,
    query: &str,
) -> Result<Entity> {
    reporter.step(0, "Searching...");
    let mut results = source.search(query, media_type, config.search_count).await?;
    debug!("{} result(s) for {:?}", results.len(), query);

    if results.is_empty() {
        return Err(Error::NoResults);
    }
    if config.lucky {
        return Ok(results.swap_remove(0));
    }

    let labels: Vec<String> = results.iter().map(label).collect();
    match chooser.choose("Select one:", &labels)? {
        Some(index) if index < results.len() => Ok(results.swap_remove(index)),
        _ => Err(Error::Declined),
    }
}
