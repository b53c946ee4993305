//! Utility functions for file naming and path collision handling

use crate::config::FileCollisionAction;
use crate::error::{Error, Result};
use crate::types::AudioFormat;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Maximum number of rename attempts when resolving file collisions
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Longest stem (in characters) kept by [`safe_file_name`]
const MAX_STEM_CHARS: usize = 200;

/// Stem used when a display name sanitizes to nothing
const FALLBACK_STEM: &str = "track";

// Literal patterns, checked by the tests below
#[allow(clippy::expect_used)]
static INVALID_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[<>:"/\\|?*\x00-\x1F\x7F]"#).expect("invalid-character pattern compiles")
});

#[allow(clippy::expect_used)]
static WHITESPACE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));

/// Build a file name that is safe on common filesystems
///
/// Characters that Windows, macOS or Linux reject are replaced with `_`,
/// whitespace runs collapse to one space, leading/trailing spaces and dots
/// are dropped and the stem is capped at 200 characters. The format's
/// extension is appended.
///
/// # Examples
///
/// ```
/// use playlist_dl::utils::safe_file_name;
/// use playlist_dl::AudioFormat;
///
/// assert_eq!(safe_file_name("AC/DC: Live?", AudioFormat::Mp3), "AC_DC_ Live_.mp3");
/// assert_eq!(safe_file_name("  ...  ", AudioFormat::Wav), "track.wav");
/// ```
#[must_use]
pub fn safe_file_name(display_name: &str, format: AudioFormat) -> String {
    // Whitespace first so tabs and newlines become spaces rather than `_`
    let collapsed = WHITESPACE_RUNS.replace_all(display_name, " ");
    let replaced = INVALID_CHARS.replace_all(&collapsed, "_");
    let trimmed = replaced.trim_matches(|c: char| c == ' ' || c == '.');

    let stem: String = trimmed.chars().take(MAX_STEM_CHARS).collect();
    let stem = stem.trim_end_matches([' ', '.']);

    let stem = if stem.is_empty() { FALLBACK_STEM } else { stem };

    format!("{}.{}", stem, format.extension())
}

/// Get a unique path for a file, handling collisions according to the specified action
///
/// - `Overwrite` returns the path unchanged.
/// - `Skip` fails if the path exists.
/// - `Rename` appends ` (1)`, ` (2)`, ... to the stem until the name is free.
///
/// # Examples
///
/// ```
/// use playlist_dl::utils::get_unique_path;
/// use playlist_dl::config::FileCollisionAction;
/// use std::path::Path;
///
/// let path = Path::new("/tmp/playlist-dl-doc/intro.mp3");
/// let unique = get_unique_path(path, FileCollisionAction::Rename).unwrap();
/// // If intro.mp3 exists, returns intro (1).mp3, then intro (2).mp3, etc.
/// ```
pub fn get_unique_path(path: &Path, action: FileCollisionAction) -> Result<PathBuf> {
    match action {
        FileCollisionAction::Overwrite => Ok(path.to_path_buf()),
        FileCollisionAction::Skip => {
            if path.exists() {
                return Err(Error::Save {
                    path: path.to_path_buf(),
                    reason: "file already exists and collision action is skip".to_string(),
                });
            }
            Ok(path.to_path_buf())
        }
        FileCollisionAction::Rename => {
            if !path.exists() {
                return Ok(path.to_path_buf());
            }

            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| Error::Save {
                    path: path.to_path_buf(),
                    reason: "cannot extract file stem".to_string(),
                })?;

            let extension = path.extension().and_then(|e| e.to_str());

            let parent = path.parent().ok_or_else(|| Error::Save {
                path: path.to_path_buf(),
                reason: "cannot extract parent directory".to_string(),
            })?;

            for i in 1..=MAX_RENAME_ATTEMPTS {
                let new_name = match extension {
                    Some(ext) => format!("{} ({}).{}", stem, i, ext),
                    None => format!("{} ({})", stem, i),
                };
                let new_path = parent.join(new_name);
                if !new_path.exists() {
                    return Ok(new_path);
                }
            }

            Err(Error::Save {
                path: path.to_path_buf(),
                reason: format!(
                    "could not find unique filename after {} attempts",
                    MAX_RENAME_ATTEMPTS
                ),
            })
        }
    }
}
