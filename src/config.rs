//! Configuration loading.
//!
//! Settings are read from a TOML file in the OS config directory:
//! - Linux: ~/.config/tideloader/config.toml
//! - macOS: ~/Library/Application Support/tideloader/config.toml
//! - Windows: %APPDATA%\tideloader\config.toml
//!
//! Every option can be overridden on the command line. The merged
//! [`Config`] is built once at startup and passed by reference afterwards.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;
use crate::models::Quality;

/// Public token of the TIDAL Android client.
pub const DEFAULT_API_TOKEN: &str = "kgsOOmYk3zShYrNP";

/// Contents written to a freshly created config file.
pub const DEFAULT_CONFIG: &str = r#"# tideloader configuration
#
# Every option here can be overridden on the command line,
# e.g. --quiet / --no-quiet or --output-directory <path>.

username = ""
password = ""

# One of "low", "high", "lossless", "hi-res".
quality = "lossless"

output-directory = "~/Music/tideloader"

# Lowercase, hyphenated file and directory names.
nice-format = false

# Always create artist and album directories, even for single tracks.
full-structure = false

skip-metadata = false

# Pick the first search result instead of asking.
lucky = false

quiet = false

search-count = 16
"#;

const DEFAULT_OUTPUT_DIRECTORY: &str = "~/Music/tideloader";
const DEFAULT_SEARCH_COUNT: u32 = 16;

/// How path segments are sanitized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingStyle {
    /// Keep names as-is apart from path separators.
    #[default]
    Plain,
    /// Lowercase alphanumerics joined by single hyphens.
    Nice,
}

/// Resolved, immutable settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub api_token: String,
    pub quality: Quality,
    /// Root directory for downloaded files.
    pub output_directory: PathBuf,
    pub naming: NamingStyle,
    /// Always emit artist and album directories.
    pub full_structure: bool,
    pub skip_metadata: bool,
    /// Take the first search result without prompting.
    pub lucky: bool,
    /// Suppress human-readable progress output.
    pub quiet: bool,
    /// Number of results requested per search.
    pub search_count: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config::resolve(&Settings::default(), &Settings::default())
    }
}

/// One layer of optional settings: the config file or the command line.
///
/// Field names follow the kebab-case keys used in the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Settings {
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_token: Option<String>,
    pub quality: Option<Quality>,
    pub output_directory: Option<String>,
    pub nice_format: Option<bool>,
    pub full_structure: Option<bool>,
    pub skip_metadata: Option<bool>,
    pub lucky: Option<bool>,
    pub quiet: Option<bool>,
    pub search_count: Option<u32>,
}

fn pick<T: Clone>(cli: &Option<T>, file: &Option<T>, default: T) -> T {
    cli.clone().or_else(|| file.clone()).unwrap_or(default)
}

impl Config {
    /// Merge two layers: command line over file over built-in defaults.
    pub fn resolve(cli: &Settings, file: &Settings) -> Config {
        let output_directory = pick(
            &cli.output_directory,
            &file.output_directory,
            DEFAULT_OUTPUT_DIRECTORY.to_string(),
        );
        let naming = if pick(&cli.nice_format, &file.nice_format, false) {
            NamingStyle::Nice
        } else {
            NamingStyle::Plain
        };

        Config {
            username: pick(&cli.username, &file.username, String::new()),
            password: pick(&cli.password, &file.password, String::new()),
            api_token: pick(&cli.api_token, &file.api_token, DEFAULT_API_TOKEN.to_string()),
            quality: pick(&cli.quality, &file.quality, Quality::default()),
            output_directory: expand_home(&output_directory),
            naming,
            full_structure: pick(&cli.full_structure, &file.full_structure, false),
            skip_metadata: pick(&cli.skip_metadata, &file.skip_metadata, false),
            lucky: pick(&cli.lucky, &file.lucky, false),
            quiet: pick(&cli.quiet, &file.quiet, false),
            search_count: pick(&cli.search_count, &file.search_count, DEFAULT_SEARCH_COUNT),
        }
    }

    /// Load the config file and apply command-line overrides.
    ///
    /// With no explicit path the default location is used, and a commented
    /// default file is created there if none exists yet. An explicit path
    /// must already exist.
    pub fn load(cli: &Settings, config_path: Option<&Path>) -> Result<Config, ConfigError> {
        let file = match config_path {
            Some(path) => read_settings(path)?,
            None => {
                let path = default_config_path().ok_or(ConfigError::NoConfigDir)?;
                ensure_default_file(&path)?;
                read_settings(&path)?
            }
        };
        Ok(Config::resolve(cli, &file))
    }
}

/// Get the full path to the default config file.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tideloader").join("config.toml"))
}

/// Write [`DEFAULT_CONFIG`] to `path` unless a file is already there.
pub fn ensure_default_file(path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        return Ok(());
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::Write(dir.to_path_buf(), e))?;
    }
    std::fs::write(path, DEFAULT_CONFIG).map_err(|e| ConfigError::Write(path.to_path_buf(), e))?;
    info!("Created default config at {:?}", path);
    Ok(())
}

/// Read one settings layer from a TOML file.
pub fn read_settings(path: &Path) -> Result<Settings, ConfigError> {
    let contents =
        std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
    toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))
}

/// Expand a leading `~` to the user's home directory.
fn expand_home(path: &str) -> PathBuf {
    let rest = if path == "~" {
        Some("")
    } else {
        path.strip_prefix("~/")
    };
    match (rest, dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
