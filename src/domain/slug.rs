//! Utilities for deriving deterministic, URL-safe slugs.
//!
//! Entry slugs come from the directory that holds an entry's source file, so
//! the slug never has to be stored alongside the content. Heading anchors are
//! generated per document and de-duplicated with a monotonic suffix.

use std::collections::HashMap;
use std::path::Path;

use slug::slugify;
use thiserror::Error;

const FALLBACK_ANCHOR: &str = "section";

/// Errors that can occur while generating a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("entry path `{path}` has no containing directory")]
    MissingDirectory { path: String },
}

/// Derive a base slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);

    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Derive an entry slug from the location of its source file.
///
/// `content/posts/hello-world/page.mdx` yields `hello-world`.
pub fn slug_from_entry_path(path: &Path) -> Result<String, SlugError> {
    let directory = path
        .parent()
        .and_then(Path::file_name)
        .and_then(|name| name.to_str())
        .ok_or_else(|| SlugError::MissingDirectory {
            path: path.display().to_string(),
        })?;

    derive_slug(directory)
}

/// Returns true when `candidate` is already in canonical slug form.
pub fn is_canonical_slug(candidate: &str) -> bool {
    !candidate.is_empty() && slugify(candidate) == candidate
}

/// Deterministically generate unique anchor slugs within a single document.
///
/// Repeats get numeric suffixes in document order (`section`, `section-1`,
/// `section-2`), skipping any suffixed form an earlier heading already took.
/// Headings without any sluggable characters share the `section` base.
#[derive(Default, Debug)]
pub struct AnchorSlugger {
    occurrences: HashMap<String, usize>,
}

impl AnchorSlugger {
    /// Create a new slugger instance.
    pub fn new() -> Self {
        Self {
            occurrences: HashMap::new(),
        }
    }

    /// Generate a slug for the provided heading text, ensuring uniqueness
    /// within this slugger.
    pub fn anchor_for(&mut self, heading: &str) -> String {
        let base = derive_slug(heading).unwrap_or_else(|_| FALLBACK_ANCHOR.to_string());
        let mut anchor = base.clone();
        while self.occurrences.contains_key(&anchor) {
            let count = self.occurrences.entry(base.clone()).or_insert(0);
            *count += 1;
            anchor = format!("{base}-{count}");
        }
        self.occurrences.insert(anchor.clone(), 0);
        anchor
    }
}
