use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Metadata for a single content entry, as shown on index pages.
///
/// The slug is derived from the entry's location on disk and is never read
/// from frontmatter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMeta {
    pub slug: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    /// Frontmatter keys outside the known schema, kept verbatim.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl EntryMeta {
    /// The updated date when present, otherwise the created date.
    pub fn effective_date(&self) -> OffsetDateTime {
        self.updated.unwrap_or(self.created)
    }
}

/// Newest first by effective date; equal dates fall back to slug order.
pub fn compare_by_effective_date(a: &EntryMeta, b: &EntryMeta) -> Ordering {
    b.effective_date()
        .cmp(&a.effective_date())
        .then_with(|| a.slug.cmp(&b.slug))
}

pub fn sort_by_effective_date(entries: &mut [EntryMeta]) {
    entries.sort_by(compare_by_effective_date);
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    fn meta(slug: &str, created: OffsetDateTime, updated: Option<OffsetDateTime>) -> EntryMeta {
        EntryMeta {
            slug: slug.to_string(),
            title: slug.to_uppercase(),
            description: "desc".to_string(),
            tags: Vec::new(),
            authors: vec!["Site Owner".to_string()],
            created,
            updated,
            excerpt: None,
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn effective_date_prefers_updated() {
        let entry = meta(
            "a",
            datetime!(2023-01-01 00:00 UTC),
            Some(datetime!(2024-06-01 00:00 UTC)),
        );
        assert_eq!(entry.effective_date(), datetime!(2024-06-01 00:00 UTC));

        let entry = meta("b", datetime!(2023-01-01 00:00 UTC), None);
        assert_eq!(entry.effective_date(), datetime!(2023-01-01 00:00 UTC));
    }

    #[test]
    fn sort_orders_newest_effective_date_first() {
        let mut entries = vec![
            meta("old", datetime!(2022-01-01 00:00 UTC), None),
            meta(
                "refreshed",
                datetime!(2021-01-01 00:00 UTC),
                Some(datetime!(2024-01-01 00:00 UTC)),
            ),
            meta("recent", datetime!(2023-05-01 00:00 UTC), None),
        ];

        sort_by_effective_date(&mut entries);

        let slugs: Vec<_> = entries.iter().map(|e| e.slug.as_str()).collect();
        assert_eq!(slugs, ["refreshed", "recent", "old"]);
    }

    #[test]
    fn sort_breaks_ties_by_slug() {
        let date = datetime!(2024-02-02 00:00 UTC);
        let mut entries = vec![meta("zeta", date, None), meta("alpha", date, None)];

        sort_by_effective_date(&mut entries);

        assert_eq!(entries[0].slug, "alpha");
        assert_eq!(entries[1].slug, "zeta");
    }

    #[test]
    fn serializes_dates_as_rfc3339() {
        let entry = meta("a", datetime!(2024-03-04 05:06:07 UTC), None);
        let json = serde_json::to_value(&entry).expect("serialize");

        assert_eq!(json["created"], "2024-03-04T05:06:07Z");
        assert!(json["updated"].is_null());
        assert!(json.get("extra").is_none());

        let back: EntryMeta = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, entry);
    }
}
