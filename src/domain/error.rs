use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("unknown collection `{collection}`")]
    UnknownCollection { collection: String },
    #[error("entry `{slug}` not found in collection `{collection}`")]
    EntryNotFound { collection: String, slug: String },
    #[error("slug `{slug}` is claimed by both `{}` and `{}`", first.display(), second.display())]
    DuplicateSlug {
        slug: String,
        first: PathBuf,
        second: PathBuf,
    },
}

impl DomainError {
    pub fn unknown_collection(collection: impl Into<String>) -> Self {
        Self::UnknownCollection {
            collection: collection.into(),
        }
    }

    pub fn entry_not_found(collection: impl Into<String>, slug: impl Into<String>) -> Self {
        Self::EntryNotFound {
            collection: collection.into(),
            slug: slug.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::UnknownCollection { .. } | Self::EntryNotFound { .. }
        )
    }
}
