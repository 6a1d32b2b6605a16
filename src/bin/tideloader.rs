use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tideloader::api::{MediaSource, TidalClient};
use tideloader::config::{Config, Settings};
use tideloader::reporter;
use tideloader::search::{self, TerminalChooser};
use tideloader::{Downloader, Entity, Error, MediaType, Quality, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "tideloader", version)]
#[command(about = "Download tracks, albums and discographies from TIDAL", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download a single track
    Track(Args),
    /// Download every track of an album
    Album(Args),
    /// Download every album of an artist
    #[command(visible_alias = "discography")]
    Artist(Args),
}

impl Command {
    fn parts(&self) -> (MediaType, &Args) {
        match self {
            Command::Track(args) => (MediaType::Track, args),
            Command::Album(args) => (MediaType::Album, args),
            Command::Artist(args) => (MediaType::Artist, args),
        }
    }
}

#[derive(clap::Args)]
struct Args {
    /// Search query
    #[arg(required = true)]
    query: Vec<String>,

    /// Path to the config file (defaults to the OS config directory)
    #[arg(long)]
    config_path: Option<PathBuf>,

    /// TIDAL username (can also be set via TIDAL_USERNAME env var)
    #[arg(long, env = "TIDAL_USERNAME")]
    username: Option<String>,

    /// TIDAL password (can also be set via TIDAL_PASSWORD env var)
    #[arg(long, env = "TIDAL_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// API token sent on login
    #[arg(long)]
    api_token: Option<String>,

    /// Audio quality
    #[arg(long, value_enum)]
    quality: Option<QualityArg>,

    /// Root directory for downloaded files
    #[arg(long)]
    output_directory: Option<String>,

    /// Lowercase, hyphenated file and directory names
    #[arg(long, overrides_with = "no_nice_format")]
    nice_format: bool,
    #[arg(long, overrides_with = "nice_format", hide = true)]
    no_nice_format: bool,

    /// Always create artist and album directories
    #[arg(long, overrides_with = "no_full_structure")]
    full_structure: bool,
    #[arg(long, overrides_with = "full_structure", hide = true)]
    no_full_structure: bool,

    /// Do not embed tags or cover art
    #[arg(long, overrides_with = "no_skip_metadata")]
    skip_metadata: bool,
    #[arg(long, overrides_with = "skip_metadata", hide = true)]
    no_skip_metadata: bool,

    /// Take the first search result without asking
    #[arg(long, overrides_with = "no_lucky")]
    lucky: bool,
    #[arg(long, overrides_with = "lucky", hide = true)]
    no_lucky: bool,

    /// Suppress progress output
    #[arg(long, overrides_with = "no_quiet")]
    quiet: bool,
    #[arg(long, overrides_with = "quiet", hide = true)]
    no_quiet: bool,

    /// Number of search results to offer
    #[arg(long)]
    search_count: Option<u32>,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum QualityArg {
    Low,
    High,
    Lossless,
    HiRes,
}

impl From<QualityArg> for Quality {
    fn from(q: QualityArg) -> Self {
        match q {
            QualityArg::Low => Quality::Low,
            QualityArg::High => Quality::High,
            QualityArg::Lossless => Quality::Lossless,
            QualityArg::HiRes => Quality::HiRes,
        }
    }
}

/// `Some` only when one of a `--x` / `--no-x` pair was given.
fn toggle(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

impl Args {
    fn settings(&self) -> Settings {
        Settings {
            username: self.username.clone(),
            password: self.password.clone(),
            api_token: self.api_token.clone(),
            quality: self.quality.map(Quality::from),
            output_directory: self.output_directory.clone(),
            nice_format: toggle(self.nice_format, self.no_nice_format),
            full_structure: toggle(self.full_structure, self.no_full_structure),
            skip_metadata: toggle(self.skip_metadata, self.no_skip_metadata),
            lucky: toggle(self.lucky, self.no_lucky),
            quiet: toggle(self.quiet, self.no_quiet),
            search_count: self.search_count,
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let (media_type, args) = cli.command.parts();
    let config = Config::load(&args.settings(), args.config_path.as_deref())?;
    let reporter = reporter::for_config(&config);
    let client = TidalClient::new(&config)?;

    reporter.step(0, "Authenticating...");
    client.authenticate().await?;

    let query = args.query.join(" ");
    let entity = search::search(
        &client,
        &config,
        reporter.as_ref(),
        &TerminalChooser,
        media_type,
        &query,
    )
    .await?;
    reporter.step(0, &format!("Downloading \"{}\"...", entity.name()));

    let downloader =
        Downloader::new(&client, &config, reporter.as_ref(), reqwest::Client::new());
    match &entity {
        Entity::Track(track) => {
            downloader.download_track(track, None, false, false, 0).await?;
        }
        Entity::Album(album) => {
            downloader.download_album(album, false, 0).await?;
        }
        Entity::Artist(artist) => {
            downloader.download_discography(artist, 0).await?;
        }
    }

    reporter.step(0, "Done!");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tideloader=warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = tokio::select! {
        result = run(cli) => result,
        _ = tokio::signal::ctrl_c() => Err(Error::Interrupted),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = e.to_string();
            if !e.is_soft() && !message.is_empty() {
                eprintln!("{}", message);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_pairs() {
        assert_eq!(toggle(false, false), None);
        assert_eq!(toggle(true, false), Some(true));
        assert_eq!(toggle(false, true), Some(false));
    }

    #[test]
    fn test_flags_become_settings() {
        let cli = Cli::try_parse_from([
            "tideloader",
            "discography",
            "daft",
            "punk",
            "--quality",
            "hi-res",
            "--no-quiet",
            "--lucky",
            "--search-count",
            "3",
        ])
        .unwrap();
        let (media_type, args) = cli.command.parts();
        assert_eq!(media_type, MediaType::Artist);
        assert_eq!(args.query.join(" "), "daft punk");

        let settings = args.settings();
        assert_eq!(settings.quality, Some(Quality::HiRes));
        assert_eq!(settings.quiet, Some(false));
        assert_eq!(settings.lucky, Some(true));
        assert_eq!(settings.nice_format, None);
        assert_eq!(settings.search_count, Some(3));
    }

    #[test]
    fn test_later_flag_of_pair_wins() {
        let cli =
            Cli::try_parse_from(["tideloader", "track", "x", "--quiet", "--no-quiet"]).unwrap();
        assert_eq!(cli.command.parts().1.settings().quiet, Some(false));
    }

    #[test]
    fn test_query_is_required() {
        assert!(Cli::try_parse_from(["tideloader", "album"]).is_err());
    }
}
