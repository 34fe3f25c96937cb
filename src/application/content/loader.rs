//! Turn one entry file into metadata or a compiled entry.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::debug;

use crate::{
    application::render::{RenderRequest, RenderService},
    domain::{
        entities::EntryMeta,
        frontmatter::{FrontmatterDefaults, parse_frontmatter},
        slug::slug_from_entry_path,
    },
};

use super::{Entry, error::ContentError};

pub async fn read_source(path: &Path) -> Result<String, ContentError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|err| ContentError::io(path, err))
}

/// Parse metadata from already-read source text.
pub fn meta_from_source(
    path: &Path,
    source: &str,
    defaults: &FrontmatterDefaults,
) -> Result<EntryMeta, ContentError> {
    let slug = entry_slug(path)?;
    let (frontmatter, _) =
        parse_frontmatter(source, defaults).map_err(|source| ContentError::Frontmatter {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(frontmatter.into_meta(slug))
}

/// Parse metadata and compile the body of already-read source text.
pub fn compile_source(
    path: &Path,
    source: &str,
    defaults: &FrontmatterDefaults,
    renderer: &dyn RenderService,
) -> Result<Entry, ContentError> {
    let slug = entry_slug(path)?;
    let (frontmatter, body) =
        parse_frontmatter(source, defaults).map_err(|source| ContentError::Frontmatter {
            path: path.to_path_buf(),
            source,
        })?;

    let mut request = RenderRequest::new(slug.clone(), body);
    if let Some(dir) = path.parent() {
        request = request.with_base_dir(dir);
    }
    let body = renderer
        .render(&request)
        .map_err(|source| ContentError::Render {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(
        target = "application::content::loader",
        slug = %slug,
        path = %path.display(),
        "Compiled entry"
    );

    Ok(Entry {
        meta: frontmatter.into_meta(slug),
        body,
    })
}

pub async fn load_meta(
    path: &Path,
    defaults: &FrontmatterDefaults,
) -> Result<EntryMeta, ContentError> {
    let source = read_source(path).await?;
    meta_from_source(path, &source, defaults)
}

/// Read and compile an entry. Rendering is CPU-bound and runs on the
/// blocking pool.
pub async fn load_entry(
    path: PathBuf,
    defaults: FrontmatterDefaults,
    renderer: Arc<dyn RenderService>,
) -> Result<Entry, ContentError> {
    let source = read_source(&path).await?;
    compile_blocking(path, source, defaults, renderer).await
}

pub(crate) async fn compile_blocking(
    path: PathBuf,
    source: String,
    defaults: FrontmatterDefaults,
    renderer: Arc<dyn RenderService>,
) -> Result<Entry, ContentError> {
    tokio::task::spawn_blocking(move || {
        compile_source(&path, &source, &defaults, renderer.as_ref())
    })
    .await
    .map_err(ContentError::task)?
}

fn entry_slug(path: &Path) -> Result<String, ContentError> {
    slug_from_entry_path(path).map_err(|source| ContentError::Slug {
        path: path.to_path_buf(),
        source,
    })
}
