//! Collection listing and entry lookup.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::try_join_all;
use tracing::{debug, info, warn};

use crate::{
    application::render::RenderService,
    cache::{EntryCache, EntryKey, MetaListCache, source_digest},
    domain::{
        entities::{EntryMeta, sort_by_effective_date},
        error::DomainError,
        frontmatter::FrontmatterDefaults,
        slug::{is_canonical_slug, slug_from_entry_path},
    },
};

use super::{
    Entry,
    discovery::discover_blocking,
    error::ContentError,
    loader::{compile_blocking, load_meta, read_source},
};

const TARGET: &str = "application::content";

/// Where entries live and how they are interpreted.
#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub root: PathBuf,
    pub collections: Vec<String>,
    /// Glob relative to each collection root, e.g. `*/page.mdx`.
    pub pattern: String,
    pub defaults: FrontmatterDefaults,
}

impl From<&crate::config::ContentSettings> for ContentSettings {
    fn from(settings: &crate::config::ContentSettings) -> Self {
        Self {
            root: settings.root.clone(),
            collections: settings.collections.clone(),
            pattern: settings.pattern.clone(),
            defaults: FrontmatterDefaults {
                default_author: settings.default_author.clone(),
            },
        }
    }
}

pub struct ContentService {
    settings: ContentSettings,
    renderer: Arc<dyn RenderService>,
    lists: Option<MetaListCache>,
    entries: Option<EntryCache<Arc<Entry>>>,
}

impl ContentService {
    pub fn new(settings: ContentSettings, renderer: Arc<dyn RenderService>) -> Self {
        Self {
            settings,
            renderer,
            lists: None,
            entries: None,
        }
    }

    pub fn with_list_cache(mut self, cache: MetaListCache) -> Self {
        self.lists = Some(cache);
        self
    }

    pub fn with_entry_cache(mut self, cache: EntryCache<Arc<Entry>>) -> Self {
        self.entries = Some(cache);
        self
    }

    pub fn collections(&self) -> &[String] {
        &self.settings.collections
    }

    /// Metadata of every entry in `collection`, newest first.
    ///
    /// Served from the list cache when present. A cache failure is logged
    /// and never fails the request; a single unreadable entry fails the
    /// whole listing.
    pub async fn list(&self, collection: &str) -> Result<Vec<EntryMeta>, ContentError> {
        let collection_root = self.collection_root(collection)?;

        if let Some(cache) = &self.lists {
            match cache.get(collection).await {
                Ok(Some(entries)) => {
                    debug!(target = TARGET, collection, "List cache hit");
                    return Ok(entries);
                }
                Ok(None) => {}
                Err(err) => warn!(
                    target = TARGET,
                    collection,
                    error = %err,
                    "List cache read failed; rebuilding"
                ),
            }
        }

        let entries = self.collect(&collection_root).await?;

        if let Some(cache) = &self.lists
            && let Err(err) = cache.put(collection, &entries).await
        {
            warn!(
                target = TARGET,
                collection,
                error = %err,
                "List cache write failed"
            );
        }

        Ok(entries)
    }

    /// Compiled entry `slug` of `collection`.
    pub async fn get(&self, collection: &str, slug: &str) -> Result<Arc<Entry>, ContentError> {
        let collection_root = self.collection_root(collection)?;
        if !is_canonical_slug(slug) {
            return Err(DomainError::entry_not_found(collection, slug).into());
        }

        let path = self
            .resolve_entry(collection_root, slug)
            .await?
            .ok_or_else(|| DomainError::entry_not_found(collection, slug))?;
        let source = read_source(&path).await?;

        let key = EntryKey::new(collection, slug);
        let digest = source_digest(&source);
        if let Some(cache) = &self.entries
            && let Some(entry) = cache.get(&key, &digest)
        {
            debug!(target = TARGET, collection, slug, "Entry cache hit");
            return Ok(entry);
        }

        let entry = Arc::new(
            compile_blocking(
                path,
                source,
                self.settings.defaults.clone(),
                Arc::clone(&self.renderer),
            )
            .await?,
        );

        if let Some(cache) = &self.entries {
            cache.put(key, digest, Arc::clone(&entry));
        }
        Ok(entry)
    }

    /// Rebuild the list for `collection` and overwrite its cache entry.
    /// Returns the number of entries listed.
    pub async fn warm(&self, collection: &str) -> Result<usize, ContentError> {
        let collection_root = self.collection_root(collection)?;
        let entries = self.collect(&collection_root).await?;

        if let Some(cache) = &self.lists {
            cache.put(collection, &entries).await?;
        }

        info!(
            target = TARGET,
            collection,
            entries = entries.len(),
            "Warmed collection"
        );
        Ok(entries.len())
    }

    fn collection_root(&self, collection: &str) -> Result<PathBuf, ContentError> {
        if !self.settings.collections.iter().any(|c| c == collection) {
            return Err(DomainError::unknown_collection(collection).into());
        }
        Ok(self.settings.root.join(collection))
    }

    async fn collect(&self, collection_root: &Path) -> Result<Vec<EntryMeta>, ContentError> {
        let paths =
            discover_blocking(collection_root.to_path_buf(), self.settings.pattern.clone()).await?;
        let defaults = &self.settings.defaults;
        let metas = try_join_all(paths.iter().map(|path| load_meta(path, defaults))).await?;

        ensure_unique_slugs(&paths, &metas)?;

        let mut metas = metas;
        sort_by_effective_date(&mut metas);
        debug!(
            target = TARGET,
            root = %collection_root.display(),
            entries = metas.len(),
            "Collected entry metadata"
        );
        Ok(metas)
    }

    /// Directory names are slugified, so `My Post/` serves `my-post`. Two
    /// directories claiming the same slug fail as they do in [`Self::list`].
    async fn resolve_entry(
        &self,
        collection_root: PathBuf,
        slug: &str,
    ) -> Result<Option<PathBuf>, ContentError> {
        let paths = discover_blocking(collection_root, self.settings.pattern.clone()).await?;
        let mut matches = paths
            .into_iter()
            .filter(|path| slug_from_entry_path(path).is_ok_and(|derived| derived == slug));

        let Some(first) = matches.next() else {
            return Ok(None);
        };
        if let Some(second) = matches.next() {
            return Err(DomainError::DuplicateSlug {
                slug: slug.to_string(),
                first,
                second,
            }
            .into());
        }
        Ok(Some(first))
    }
}

fn ensure_unique_slugs(paths: &[PathBuf], metas: &[EntryMeta]) -> Result<(), DomainError> {
    let mut seen: HashMap<&str, &PathBuf> = HashMap::with_capacity(metas.len());
    for (path, meta) in paths.iter().zip(metas) {
        if let Some(first) = seen.insert(meta.slug.as_str(), path) {
            return Err(DomainError::DuplicateSlug {
                slug: meta.slug.clone(),
                first: first.clone(),
                second: path.clone(),
            });
        }
    }
    Ok(())
}
