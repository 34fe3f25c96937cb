use std::{
    fs,
    path::{Component, Path, PathBuf},
};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use tracing::warn;

const INLINE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "svg", "webp"];

/// Inlines local image references as `data:` URLs.
pub(crate) struct ImageInliner<'a> {
    base_dir: Option<&'a Path>,
    max_bytes: u64,
    slug: &'a str,
}

impl<'a> ImageInliner<'a> {
    pub(crate) fn new(base_dir: Option<&'a Path>, max_bytes: u64, slug: &'a str) -> Self {
        Self {
            base_dir,
            max_bytes,
            slug,
        }
    }

    /// Returns the `data:` URL for `src` when it points at a readable local
    /// image within the size limit; `None` leaves the reference untouched.
    pub(crate) fn inline(&self, src: &str) -> Option<String> {
        let base_dir = self.base_dir?;
        let relative = local_reference(src)?;
        let extension = relative
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)?;
        if !INLINE_EXTENSIONS.contains(&extension.as_str()) {
            return None;
        }

        let path = base_dir.join(&relative);
        let size = match fs::metadata(&path) {
            Ok(metadata) if metadata.is_file() => metadata.len(),
            Ok(_) => {
                self.skip(&path, "not a regular file");
                return None;
            }
            Err(err) => {
                self.skip(&path, &err.to_string());
                return None;
            }
        };
        if size > self.max_bytes {
            self.skip(&path, "exceeds inline size limit");
            return None;
        }

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.skip(&path, &err.to_string());
                return None;
            }
        };

        let mime = mime_guess::from_ext(&extension).first_or_octet_stream();
        Some(format!("data:{};base64,{}", mime.essence_str(), STANDARD.encode(bytes)))
    }

    fn skip(&self, path: &Path, reason: &str) {
        warn!(
            target = "application::render::images",
            slug = self.slug,
            path = %path.display(),
            reason,
            "Image left as a reference"
        );
    }
}

/// Relative filesystem path for `src`, or `None` for remote, absolute,
/// `data:` and otherwise schemed URLs.
fn local_reference(src: &str) -> Option<PathBuf> {
    let src = src.trim();
    if src.is_empty() || src.starts_with('/') || src.starts_with('#') || has_scheme(src) {
        return None;
    }

    let path_part = src.split(['?', '#']).next().unwrap_or(src);
    let path = PathBuf::from(path_part);
    path.components()
        .all(|component| {
            matches!(
                component,
                Component::Normal(_) | Component::CurDir | Component::ParentDir
            )
        })
        .then_some(path)
}

fn has_scheme(src: &str) -> bool {
    match src.split_once(':') {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && !scheme.contains('/')
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_local_references() {
        assert_eq!(local_reference("./img/a.png"), Some(PathBuf::from("./img/a.png")));
        assert_eq!(local_reference("a.png?v=2"), Some(PathBuf::from("a.png")));
        assert_eq!(local_reference("https://cdn.example.com/a.png"), None);
        assert_eq!(local_reference("data:image/png;base64,AAAA"), None);
        assert_eq!(local_reference("/static/a.png"), None);
    }

    #[test]
    fn inlines_small_images_and_skips_the_rest() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("dot.png"), [0x89, b'P', b'N', b'G']).expect("write png");
        fs::write(dir.path().join("big.gif"), vec![0u8; 32]).expect("write gif");
        fs::write(dir.path().join("notes.txt"), "text").expect("write txt");

        let inliner = ImageInliner::new(Some(dir.path()), 16, "post");

        assert_eq!(
            inliner.inline("dot.png").as_deref(),
            Some("data:image/png;base64,iVBORw==")
        );
        assert_eq!(inliner.inline("big.gif"), None);
        assert_eq!(inliner.inline("missing.webp"), None);
        assert_eq!(inliner.inline("notes.txt"), None);
    }

    #[test]
    fn nothing_is_inlined_without_a_base_dir() {
        let inliner = ImageInliner::new(None, u64::MAX, "post");
        assert_eq!(inliner.inline("dot.png"), None);
    }
}
