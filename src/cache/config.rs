//! Cache configuration.
//!
//! Controls the metadata list store and the compiled entry LRU via the
//! `[cache]` section of `folio.toml`.

use std::{num::NonZeroUsize, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

const DEFAULT_TTL_SECONDS: u64 = 24 * 60 * 60;
const DEFAULT_ENTRY_LIMIT: usize = 64;
const DEFAULT_DIRECTORY: &str = ".folio-cache";

/// Where cached metadata lists live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local map; lost on restart.
    #[default]
    Memory,
    /// One JSON file per key under `directory`; survives restarts.
    Fs,
    /// No list caching.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub ttl: Duration,
    pub directory: PathBuf,
    pub key_prefix: Option<String>,
    /// Maximum compiled entries kept in memory; zero disables the entry cache.
    pub entry_limit: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            ttl: Duration::from_secs(DEFAULT_TTL_SECONDS),
            directory: PathBuf::from(DEFAULT_DIRECTORY),
            key_prefix: None,
            entry_limit: DEFAULT_ENTRY_LIMIT,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        let (backend, entry_limit) = if settings.enabled {
            (settings.backend, settings.entry_limit)
        } else {
            (CacheBackend::None, 0)
        };
        Self {
            backend,
            ttl: Duration::from_secs(settings.ttl_seconds),
            directory: settings.directory.clone(),
            key_prefix: settings.key_prefix.clone(),
            entry_limit,
        }
    }
}

impl CacheConfig {
    /// Returns true if metadata lists are cached.
    pub fn lists_enabled(&self) -> bool {
        self.backend != CacheBackend::None
    }

    /// Entry LRU capacity, or `None` when the entry cache is disabled.
    pub fn entry_capacity(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.entry_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert_eq!(config.backend, CacheBackend::Memory);
        assert_eq!(config.ttl, Duration::from_secs(86_400));
        assert_eq!(config.entry_limit, 64);
        assert!(config.key_prefix.is_none());
        assert!(config.lists_enabled());
    }

    #[test]
    fn zero_entry_limit_disables_entry_cache() {
        let config = CacheConfig {
            entry_limit: 0,
            ..Default::default()
        };
        assert!(config.entry_capacity().is_none());
    }

    #[test]
    fn backend_parses_lowercase_names() {
        let backend: CacheBackend = serde_json::from_str("\"fs\"").expect("backend");
        assert_eq!(backend, CacheBackend::Fs);
        let backend: CacheBackend = serde_json::from_str("\"none\"").expect("backend");
        assert!(!CacheConfig {
            backend,
            ..Default::default()
        }
        .lists_enabled());
    }
}
