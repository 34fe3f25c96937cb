//! Enumerate entry files under a collection root.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern, glob_with};
use tracing::{debug, warn};

use super::error::ContentError;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Regular files matching `pattern` beneath `root`, sorted by path.
///
/// A missing root yields no entries rather than an error. Hidden files and
/// directories only match when the pattern names them explicitly.
pub fn discover(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, ContentError> {
    if !root.is_dir() {
        warn!(
            target = "application::content::discovery",
            root = %root.display(),
            "Collection root does not exist"
        );
        return Ok(Vec::new());
    }

    let full_pattern = format!(
        "{}/{}",
        Pattern::escape(&root.to_string_lossy()),
        pattern.trim_start_matches('/')
    );
    let matches = glob_with(&full_pattern, MATCH_OPTIONS).map_err(|source| {
        ContentError::Pattern {
            pattern: pattern.to_string(),
            source,
        }
    })?;

    let mut paths = Vec::new();
    for entry in matches {
        let path = entry.map_err(|err| {
            let path = err.path().to_path_buf();
            ContentError::io(&path, err.into_error())
        })?;
        if path.is_file() {
            paths.push(path);
        }
    }
    paths.sort();

    debug!(
        target = "application::content::discovery",
        root = %root.display(),
        pattern,
        count = paths.len(),
        "Discovered entries"
    );
    Ok(paths)
}

/// [`discover`] on the blocking pool.
pub async fn discover_blocking(
    root: PathBuf,
    pattern: String,
) -> Result<Vec<PathBuf>, ContentError> {
    tokio::task::spawn_blocking(move || discover(&root, &pattern))
        .await
        .map_err(ContentError::task)?
}
