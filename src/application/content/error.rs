use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::{
    application::render::RenderError,
    cache::CacheError,
    domain::{error::DomainError, frontmatter::FrontmatterError, slug::SlugError},
};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("failed to read `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid frontmatter in `{}`", path.display())]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: FrontmatterError,
    },
    #[error("cannot derive a slug for `{}`", path.display())]
    Slug {
        path: PathBuf,
        #[source]
        source: SlugError,
    },
    #[error("failed to render `{}`", path.display())]
    Render {
        path: PathBuf,
        #[source]
        source: RenderError,
    },
    #[error("invalid discovery pattern `{pattern}`")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("background task failed: {message}")]
    Task { message: String },
}

impl ContentError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn task(err: impl std::fmt::Display) -> Self {
        Self::Task {
            message: err.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Domain(err) if err.is_not_found())
    }
}
