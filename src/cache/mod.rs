//! Folio cache system.
//!
//! Two layers back the content service:
//!
//! - **List cache**: sorted metadata lists per collection, stored in a
//!   [`KvStore`] with a TTL. Refreshed only by expiry or an explicit warm.
//! - **Entry cache**: an in-memory LRU of compiled entries, validated against
//!   a digest of the source file.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! backend = "memory"   # memory | fs | none
//! ttl_seconds = 86400
//! entry_limit = 64
//! ```

mod config;
mod entries;
mod keys;
mod lists;
mod lock;
mod store;

pub use config::{CacheBackend, CacheConfig};
pub use entries::{EntryCache, source_digest};
pub use keys::{EntryKey, list_key};
pub use lists::MetaListCache;
pub use store::{
    CacheError, Clock, FsKvStore, KvStore, ManualClock, MemoryKvStore, SystemClock, open_store,
};

pub const METRIC_LIST_HIT: &str = "folio_cache_list_hit_total";
pub const METRIC_LIST_MISS: &str = "folio_cache_list_miss_total";
pub const METRIC_LIST_STORE: &str = "folio_cache_list_store_total";
pub const METRIC_ENTRY_HIT: &str = "folio_cache_entry_hit_total";
pub const METRIC_ENTRY_MISS: &str = "folio_cache_entry_miss_total";
pub const METRIC_ENTRY_STORE: &str = "folio_cache_entry_store_total";
