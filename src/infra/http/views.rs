//! Domain to wire conversions.

use folio_api_types::{
    EntryMetrics, EntryResponse, EntrySummary, OpenGraphProperty, TocItem,
};

use crate::{
    application::{
        content::Entry,
        render::{ContentMetrics, TocEntry},
    },
    domain::{
        entities::EntryMeta,
        open_graph::{SiteIdentity, open_graph},
    },
};

pub(super) fn entry_summary(meta: &EntryMeta) -> EntrySummary {
    EntrySummary {
        slug: meta.slug.clone(),
        title: meta.title.clone(),
        description: meta.description.clone(),
        tags: meta.tags.clone(),
        authors: meta.authors.clone(),
        created: meta.created,
        updated: meta.updated,
        excerpt: meta.excerpt.clone(),
        extra: meta.extra.clone(),
    }
}

pub(super) fn entry_response(entry: &Entry, site: &SiteIdentity, collection: &str) -> EntryResponse {
    EntryResponse {
        meta: entry_summary(&entry.meta),
        html: entry.body.html.clone(),
        toc: entry.body.toc.iter().map(toc_item).collect(),
        contains_code: entry.body.contains_code,
        metrics: entry_metrics(&entry.body.content_metrics),
        open_graph: open_graph(&entry.meta, site, collection)
            .into_iter()
            .map(|(property, content)| OpenGraphProperty {
                property: property.to_string(),
                content,
            })
            .collect(),
    }
}

fn toc_item(entry: &TocEntry) -> TocItem {
    TocItem {
        level: entry.level,
        anchor: entry.anchor.clone(),
        text: entry.text.clone(),
        children: entry.children.iter().map(toc_item).collect(),
    }
}

fn entry_metrics(metrics: &ContentMetrics) -> EntryMetrics {
    EntryMetrics {
        word_count: metrics.word_count,
        reading_time_minutes: metrics.reading_time_minutes,
        internal_links_count: metrics.internal_links_count,
        external_links_count: metrics.external_links_count,
        images_count: metrics.images_count,
        images_missing_alt: metrics.images_missing_alt,
        code_blocks_count: metrics.code_blocks_count,
    }
}
