//! Cache key definitions.

/// Key of the sorted metadata list for `collection`, optionally namespaced.
pub fn list_key(prefix: Option<&str>, collection: &str) -> String {
    match prefix.map(str::trim).filter(|prefix| !prefix.is_empty()) {
        Some(prefix) => format!("{prefix}:{collection}"),
        None => collection.to_string(),
    }
}

/// Identifies a compiled entry in the entry cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub collection: String,
    pub slug: String,
}

impl EntryKey {
    pub fn new(collection: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            slug: slug.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_key_is_the_collection_name_by_default() {
        assert_eq!(list_key(None, "posts"), "posts");
        assert_eq!(list_key(Some("  "), "articles"), "articles");
    }

    #[test]
    fn list_key_applies_prefix() {
        assert_eq!(list_key(Some("site-a"), "posts"), "site-a:posts");
    }
}
