//! Assemble the content service from loaded settings.

use std::sync::Arc;

use tracing::info;

use crate::{
    application::{
        content::{ContentService, ContentSettings},
        render::{ComrakRenderService, RenderPipelineConfig},
    },
    cache::{CacheConfig, Clock, EntryCache, MetaListCache, SystemClock, open_store},
    config::Settings,
    domain::open_graph::SiteIdentity,
};

use super::error::InfraError;

pub async fn build_content_service(settings: &Settings) -> Result<ContentService, InfraError> {
    build_content_service_with_clock(settings, Arc::new(SystemClock)).await
}

/// As [`build_content_service`], with an injectable clock for cache expiry.
pub async fn build_content_service_with_clock(
    settings: &Settings,
    clock: Arc<dyn Clock>,
) -> Result<ContentService, InfraError> {
    let renderer = Arc::new(ComrakRenderService::new(RenderPipelineConfig::from(
        &settings.render,
    )));
    let cache = CacheConfig::from(&settings.cache);
    let mut service = ContentService::new(ContentSettings::from(&settings.content), renderer);

    if let Some(store) = open_store(&cache, clock).await? {
        service = service.with_list_cache(MetaListCache::new(
            store,
            cache.ttl,
            cache.key_prefix.clone(),
        ));
    }
    if let Some(capacity) = cache.entry_capacity() {
        service = service.with_entry_cache(EntryCache::new(capacity));
    }

    info!(
        target = "infra::bootstrap",
        root = %settings.content.root.display(),
        collections = ?settings.content.collections,
        cache_backend = ?cache.backend,
        entry_cache = cache.entry_limit,
        "Content service ready"
    );
    Ok(service)
}

pub fn site_identity(settings: &Settings) -> SiteIdentity {
    SiteIdentity::new(
        &settings.site.origin,
        settings.site.name.clone(),
        settings.site.locale.clone(),
    )
}
