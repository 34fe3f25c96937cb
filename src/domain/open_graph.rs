//! Open Graph (<https://ogp.me>) properties for entry pages.

use time::format_description::well_known::Rfc3339;

use super::entities::EntryMeta;

/// Site-level values that feed into per-entry metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteIdentity {
    /// Canonical origin without a trailing slash, e.g. `https://example.com`.
    pub origin: String,
    pub name: String,
    /// BCP 47 locale such as `en-US`.
    pub locale: String,
}

impl SiteIdentity {
    pub fn new(origin: &str, name: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            origin: origin.trim().trim_end_matches('/').to_string(),
            name: name.into(),
            locale: locale.into(),
        }
    }

    /// Open Graph spells locales with an underscore (`en_US`).
    pub fn og_locale(&self) -> String {
        self.locale.replace('-', "_")
    }
}

pub type OgProperty = (&'static str, String);

/// Build the Open Graph property list for an entry in `collection`.
pub fn open_graph(meta: &EntryMeta, site: &SiteIdentity, collection: &str) -> Vec<OgProperty> {
    let mut properties = vec![
        (
            "og:url",
            format!("{}/{}/{}", site.origin, collection, meta.slug),
        ),
        ("og:title", meta.title.clone()),
        ("og:description", meta.description.clone()),
        ("og:site_name", site.name.clone()),
        ("og:locale", site.og_locale()),
        ("og:type", "article".to_string()),
    ];

    if let Ok(published) = meta.created.format(&Rfc3339) {
        properties.push(("og:article:published_time", published));
    }
    if let Some(modified) = meta.updated.and_then(|updated| updated.format(&Rfc3339).ok()) {
        properties.push(("og:article:modified_time", modified));
    }

    properties.extend(meta.tags.iter().map(|tag| ("og:article:tag", tag.clone())));
    properties.extend(
        meta.authors
            .iter()
            .map(|author| ("og:article:author", author.clone())),
    );

    properties
}
