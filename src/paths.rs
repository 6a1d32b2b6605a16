//! Output path layout.
//!
//! A track lands at
//! `<output>/[artist]/[album]/[Disc N]/<stem>.<ext>` where every segment is
//! sanitized according to the configured [`NamingStyle`]. While in flight
//! the file is named `<stem>.part.<ext>` so it can never be mistaken for a
//! finished download.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::api::{MediaSource, SourceResult};
use crate::config::{Config, NamingStyle};
use crate::models::{FormatKind, Track};

/// Marker inserted before the extension of in-progress files.
pub const TEMPORARY_MARKER: &str = "part";

/// Sanitize one path segment.
///
/// `Plain` only removes `/`. `Nice` lowercases, keeps alphanumerics and
/// turns runs of spaces and hyphens into a single hyphen. Both are
/// idempotent.
pub fn sanitize(style: NamingStyle, input: &str) -> String {
    match style {
        NamingStyle::Plain => input.chars().filter(|c| *c != '/').collect(),
        NamingStyle::Nice => {
            let lowered = input.to_lowercase();
            let kept: String = lowered
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '-')
                .collect();
            kept.split([' ', '-'])
                .filter(|word| !word.is_empty())
                .collect::<Vec<_>>()
                .join("-")
        }
    }
}

/// Zero-padding widths shared by every track of one album.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlbumNumbering {
    max_disc: u32,
    max_track: u32,
}

impl AlbumNumbering {
    /// Compute widths from an album's full track listing.
    ///
    /// `track` is included so an empty listing still yields sane widths.
    pub fn from_siblings(track: &Track, siblings: &[Track]) -> Self {
        siblings.iter().fold(
            Self {
                max_disc: track.disc_number,
                max_track: track.track_number,
            },
            |acc, sibling| Self {
                max_disc: acc.max_disc.max(sibling.disc_number),
                max_track: acc.max_track.max(sibling.track_number),
            },
        )
    }

    /// Whether the album needs per-disc subdirectories.
    pub fn has_multiple_discs(&self) -> bool {
        self.max_disc > 1
    }

    pub fn disc_label(&self, disc: u32) -> String {
        format!("{:0width$}", disc, width = digits(self.max_disc))
    }

    pub fn track_label(&self, number: u32) -> String {
        format!("{:0width$}", number, width = digits(self.max_track))
    }
}

fn digits(n: u32) -> usize {
    n.to_string().len()
}

/// Which directory segments to emit for a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PathLayout {
    pub include_artist: bool,
    /// Present when the album directory is emitted.
    pub album: Option<AlbumNumbering>,
}

/// Build the extension-less path of a track. Pure.
pub fn track_stem(config: &Config, track: &Track, layout: PathLayout) -> PathBuf {
    let style = config.naming;
    let mut segments = Vec::new();

    if layout.include_artist {
        let artist = track
            .album
            .primary_artist()
            .map(|a| a.name.as_str())
            .or_else(|| track.primary_artist())
            .unwrap_or_default();
        segments.push(sanitize(style, artist));
    }

    let file = match layout.album {
        Some(numbering) => {
            segments.push(sanitize(style, &track.album.title));
            if numbering.has_multiple_discs() {
                let disc = format!("Disc {}", numbering.disc_label(track.disc_number));
                segments.push(sanitize(style, &disc));
            }
            let name = format!("{} {}", numbering.track_label(track.track_number), track.title);
            sanitize(style, &name)
        }
        None => sanitize(style, &track.title),
    };

    let directory = segments
        .into_iter()
        .filter(|segment| is_usable(segment))
        .fold(config.output_directory.clone(), |path, segment| path.join(segment));

    // The file segment is never dropped, or the stem would name its parent.
    if is_usable(&file) {
        directory.join(file)
    } else {
        debug!("Track {} has no usable name, falling back to its id", track.id);
        directory.join(sanitize(style, &format!("Track {}", track.id)))
    }
}

/// Empty, `.` and `..` segments would escape or collapse the layout.
fn is_usable(segment: &str) -> bool {
    !matches!(segment, "" | "." | "..")
}

/// Resolve the extension-less path of a track.
///
/// When the album directory is emitted and no sibling listing is supplied,
/// the album's tracks are fetched once to compute padding widths.
pub async fn resolve_track_stem(
    source: &dyn MediaSource,
    config: &Config,
    track: &Track,
    siblings: Option<&[Track]>,
    include_artist: bool,
    include_album: bool,
) -> SourceResult<PathBuf> {
    let include_artist = include_artist || config.full_structure;
    let include_album = include_album || config.full_structure;

    let album = if include_album {
        let numbering = match siblings {
            Some(siblings) => AlbumNumbering::from_siblings(track, siblings),
            None => {
                debug!("Fetching siblings of track {} for padding", track.id);
                let fetched = source.get_album_tracks(&track.album).await?;
                AlbumNumbering::from_siblings(track, &fetched)
            }
        };
        Some(numbering)
    } else {
        None
    };

    Ok(track_stem(
        config,
        track,
        PathLayout {
            include_artist,
            album,
        },
    ))
}

/// Final and in-progress locations of one track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    pub final_path: PathBuf,
    pub temporary_path: PathBuf,
}

impl DownloadTarget {
    pub fn new(stem: &Path, format: FormatKind) -> Self {
        let extension = format.extension();
        Self {
            final_path: with_suffix(stem, &format!(".{}", extension)),
            temporary_path: with_suffix(stem, &format!(".{}.{}", TEMPORARY_MARKER, extension)),
        }
    }

    /// File name of the final path, for log lines.
    pub fn file_name(&self) -> String {
        self.final_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

// `Path::with_extension` would clobber dots that are part of a title.
fn with_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut path: OsString = stem.as_os_str().to_owned();
    path.push(suffix);
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{album, config_in, track, ScriptedSource};
    use proptest::prelude::*;
    use std::sync::atomic::Ordering;

    fn plain_config() -> Config {
        config_in(Path::new("/music"))
    }

    #[test]
    fn test_sanitize_plain_strips_only_separator() {
        assert_eq!(sanitize(NamingStyle::Plain, "AC/DC: Live?"), "ACDC: Live?");
        assert_eq!(sanitize(NamingStyle::Plain, "Disc 1"), "Disc 1");
    }

    #[test]
    fn test_sanitize_nice() {
        assert_eq!(sanitize(NamingStyle::Nice, "Hello,  World!"), "hello-world");
        assert_eq!(
            sanitize(NamingStyle::Nice, "  - AC/DC -- Back in Black "),
            "acdc-back-in-black"
        );
        assert_eq!(sanitize(NamingStyle::Nice, "01 Intro"), "01-intro");
        assert_eq!(sanitize(NamingStyle::Nice, "?!"), "");
    }

    fn messy_name() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-zA-Z0-9 _./\\-:?!ÀÉÖßΣσςİ]{0,40}").unwrap()
    }

    proptest! {
        #[test]
        fn sanitize_plain_is_idempotent(input in messy_name()) {
            let once = sanitize(NamingStyle::Plain, &input);
            prop_assert_eq!(sanitize(NamingStyle::Plain, &once), once.clone());
            prop_assert!(!once.contains('/'));
        }

        #[test]
        fn sanitize_nice_is_idempotent(input in messy_name()) {
            let once = sanitize(NamingStyle::Nice, &input);
            prop_assert_eq!(sanitize(NamingStyle::Nice, &once), once.clone());
            prop_assert!(!once.starts_with('-') && !once.ends_with('-'));
            prop_assert!(!once.contains("--"));
        }

        #[test]
        fn sanitize_arbitrary_unicode_is_idempotent(input in any::<String>()) {
            for style in [NamingStyle::Plain, NamingStyle::Nice] {
                let once = sanitize(style, &input);
                prop_assert_eq!(sanitize(style, &once), once.clone());
            }
        }
    }

    #[test]
    fn test_padding_is_consistent_within_album() {
        let demo = album("a1", "Demo");
        let mut siblings: Vec<Track> = (1..=12)
            .map(|n| {
                let disc = 1 + (n > 6) as u32;
                track(&format!("t{}", n), &format!("Song {}", n), disc, n, &demo)
            })
            .collect();
        let config = plain_config();

        let labels = |tracks: &[Track]| -> Vec<String> {
            tracks
                .iter()
                .map(|t| {
                    let layout = PathLayout {
                        include_artist: false,
                        album: Some(AlbumNumbering::from_siblings(t, tracks)),
                    };
                    let stem = track_stem(&config, t, layout);
                    stem.file_name().unwrap().to_string_lossy().into_owned()
                })
                .collect()
        };

        let forward = labels(&siblings);
        assert!(forward.iter().all(|name| name.split(' ').next().unwrap().len() == 2));
        assert_eq!(forward[0], "01 Song 1");
        assert_eq!(forward[11], "12 Song 12");

        siblings.reverse();
        let mut backward = labels(&siblings);
        backward.reverse();
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_demo_album_layout() {
        let demo = album("a1", "Demo");
        let siblings = vec![
            track("1", "One", 1, 1, &demo),
            track("2", "Two", 1, 2, &demo),
            track("3", "Three", 1, 3, &demo),
            track("4", "Four", 2, 1, &demo),
        ];
        let config = plain_config();

        let stems: Vec<PathBuf> = siblings
            .iter()
            .map(|t| {
                let layout = PathLayout {
                    include_artist: false,
                    album: Some(AlbumNumbering::from_siblings(t, &siblings)),
                };
                track_stem(&config, t, layout)
            })
            .collect();

        assert_eq!(
            stems,
            vec![
                PathBuf::from("/music/Demo/Disc 1/1 One"),
                PathBuf::from("/music/Demo/Disc 1/2 Two"),
                PathBuf::from("/music/Demo/Disc 1/3 Three"),
                PathBuf::from("/music/Demo/Disc 2/1 Four"),
            ]
        );
    }

    #[test]
    fn test_single_disc_album_has_no_disc_directory() {
        let demo = album("a1", "Demo");
        let siblings = vec![track("1", "One", 1, 1, &demo), track("2", "Two", 1, 2, &demo)];
        let layout = PathLayout {
            include_artist: true,
            album: Some(AlbumNumbering::from_siblings(&siblings[0], &siblings)),
        };

        let stem = track_stem(&plain_config(), &siblings[0], layout);
        assert_eq!(stem, PathBuf::from("/music/Artist/Demo/1 One"));
    }

    #[test]
    fn test_bare_track_is_just_the_title() {
        let demo = album("a1", "Demo");
        let t = track("1", "Mr. Blue / Sky", 1, 1, &demo);
        let stem = track_stem(&plain_config(), &t, PathLayout::default());
        assert_eq!(stem, PathBuf::from("/music/Mr. Blue  Sky"));
    }

    #[test]
    fn test_nice_layout() {
        let demo = album("a1", "Demo Tape");
        let t = track("1", "Hello World", 1, 3, &demo);
        let mut config = plain_config();
        config.naming = NamingStyle::Nice;
        let layout = PathLayout {
            include_artist: true,
            album: Some(AlbumNumbering::from_siblings(&t, &[])),
        };
        assert_eq!(
            track_stem(&config, &t, layout),
            PathBuf::from("/music/artist/demo-tape/3-hello-world")
        );
    }

    #[test]
    fn test_unnamed_tracks_stay_distinct_inside_their_directory() {
        let demo = album("a1", "Demo");
        let mut config = plain_config();
        config.naming = NamingStyle::Nice;
        let layout = PathLayout {
            include_artist: true,
            album: None,
        };

        let first = track_stem(&config, &track("1", "?", 1, 1, &demo), layout);
        let second = track_stem(&config, &track("2", "!!!", 1, 2, &demo), layout);
        assert_eq!(first, PathBuf::from("/music/artist/track-1"));
        assert_eq!(second, PathBuf::from("/music/artist/track-2"));

        let bare = track_stem(&config, &track("3", "?", 1, 1, &demo), PathLayout::default());
        assert_eq!(bare, PathBuf::from("/music/track-3"));
    }

    #[test]
    fn test_dot_segments_never_escape_the_output_directory() {
        let dots = album("a1", "..");
        let config = plain_config();

        let t = track("7", "..", 1, 1, &dots);
        let bare = track_stem(&config, &t, PathLayout::default());
        assert_eq!(bare, PathBuf::from("/music/Track 7"));

        let layout = PathLayout {
            include_artist: false,
            album: Some(AlbumNumbering::from_siblings(&t, &[])),
        };
        let nested = track_stem(&config, &t, layout);
        assert_eq!(nested, PathBuf::from("/music/1 .."));
        assert!(nested.starts_with("/music"));
        assert_eq!(nested.parent(), Some(Path::new("/music")));
    }

    #[test]
    fn test_target_keeps_dots_and_marks_temporary() {
        let target = DownloadTarget::new(Path::new("/music/Mr. Blue"), FormatKind::Flac);
        assert_eq!(target.final_path, PathBuf::from("/music/Mr. Blue.flac"));
        assert_eq!(target.temporary_path, PathBuf::from("/music/Mr. Blue.part.flac"));
        assert_eq!(target.file_name(), "Mr. Blue.flac");

        let target = DownloadTarget::new(Path::new("/music/x"), FormatKind::Mp4);
        assert_eq!(target.final_path, PathBuf::from("/music/x.m4a"));
        assert_eq!(target.temporary_path, PathBuf::from("/music/x.part.m4a"));
    }

    #[tokio::test]
    async fn test_resolve_fetches_siblings_once_when_missing() {
        let demo = album("a1", "Demo");
        let tracks = vec![
            track("1", "One", 1, 1, &demo),
            track("2", "Two", 2, 10, &demo),
        ];
        let source = ScriptedSource::new("http://unused").with_album(&demo, tracks.clone());
        let config = plain_config();

        let stem = resolve_track_stem(&source, &config, &tracks[0], None, false, true)
            .await
            .unwrap();
        assert_eq!(stem, PathBuf::from("/music/Demo/Disc 1/01 One"));
        assert_eq!(source.calls.album_tracks.load(Ordering::SeqCst), 1);

        resolve_track_stem(&source, &config, &tracks[0], Some(&tracks), false, true)
            .await
            .unwrap();
        assert_eq!(source.calls.album_tracks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_full_structure_forces_artist_and_album() {
        let demo = album("a1", "Demo");
        let tracks = vec![track("1", "One", 1, 1, &demo)];
        let source = ScriptedSource::new("http://unused").with_album(&demo, tracks.clone());
        let mut config = plain_config();
        config.full_structure = true;

        let stem = resolve_track_stem(&source, &config, &tracks[0], None, false, false)
            .await
            .unwrap();
        assert_eq!(stem, PathBuf::from("/music/Artist/Demo/1 One"));
    }

    #[tokio::test]
    async fn test_resolve_without_album_makes_no_calls() {
        let demo = album("a1", "Demo");
        let t = track("1", "One", 1, 1, &demo);
        let source = ScriptedSource::new("http://unused");

        let stem = resolve_track_stem(&source, &plain_config(), &t, None, true, false)
            .await
            .unwrap();
        assert_eq!(stem, PathBuf::from("/music/Artist/One"));
        assert_eq!(source.calls.total(), 0);
    }
}
