//! Key-value stores backing the metadata list cache.
//!
//! Values are opaque strings with a per-entry TTL. Expired entries read as
//! absent and are removed lazily on access.

use std::{
    collections::HashMap,
    fmt,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, RwLock},
    time::Duration,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::OffsetDateTime;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use super::config::{CacheBackend, CacheConfig};
use super::lock::{mutex_lock, rw_read, rw_write};

const SOURCE: &str = "cache::store";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error at `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache record at `{}` is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cache value could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CacheError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Wall-clock source, swappable in tests.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    pub fn new(start: OffsetDateTime) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        *mutex_lock(&self.now, SOURCE, "manual_clock.advance") += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *mutex_lock(&self.now, SOURCE, "manual_clock.now")
    }
}

#[async_trait]
pub trait KvStore: Send + Sync + fmt::Debug {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Open the store selected by `config`; `None` when list caching is off.
pub async fn open_store(
    config: &CacheConfig,
    clock: Arc<dyn Clock>,
) -> Result<Option<Arc<dyn KvStore>>, CacheError> {
    let store: Arc<dyn KvStore> = match config.backend {
        CacheBackend::None => return Ok(None),
        CacheBackend::Memory => Arc::new(MemoryKvStore::new(clock)),
        CacheBackend::Fs => Arc::new(FsKvStore::open(&config.directory, clock).await?),
    };
    Ok(Some(store))
}

fn expiry(now: OffsetDateTime, ttl: Duration) -> OffsetDateTime {
    now.checked_add(time::Duration::try_from(ttl).unwrap_or(time::Duration::MAX))
        .unwrap_or(time::PrimitiveDateTime::MAX.assume_utc())
}

#[derive(Debug, Clone)]
struct MemoryRecord {
    value: String,
    expires_at: OffsetDateTime,
}

/// In-process store.
#[derive(Debug)]
pub struct MemoryKvStore {
    records: RwLock<HashMap<String, MemoryRecord>>,
    clock: Arc<dyn Clock>,
}

impl MemoryKvStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            clock,
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.records, SOURCE, "memory.len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = self.clock.now();
        {
            let records = rw_read(&self.records, SOURCE, "memory.get");
            match records.get(key) {
                None => return Ok(None),
                Some(record) if record.expires_at > now => return Ok(Some(record.value.clone())),
                Some(_) => {}
            }
        }

        let mut records = rw_write(&self.records, SOURCE, "memory.expire");
        if records.get(key).is_some_and(|record| record.expires_at <= now) {
            records.remove(key);
            debug!(target = SOURCE, key, "Expired cache record removed");
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = expiry(self.clock.now(), ttl);
        rw_write(&self.records, SOURCE, "memory.set")
            .insert(key.to_string(), MemoryRecord { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        rw_write(&self.records, SOURCE, "memory.delete").remove(key);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FsRecord {
    key: String,
    /// Unix seconds.
    expires_at: i64,
    value: String,
}

/// File-per-key store that survives process restarts.
#[derive(Debug)]
pub struct FsKvStore {
    directory: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FsKvStore {
    pub async fn open(directory: &Path, clock: Arc<dyn Clock>) -> Result<Self, CacheError> {
        fs::create_dir_all(directory)
            .await
            .map_err(|err| CacheError::io(directory, err))?;
        Ok(Self {
            directory: directory.to_path_buf(),
            clock,
        })
    }

    fn record_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        self.directory
            .join(format!("{}.json", hex::encode(hasher.finalize())))
    }
}

#[async_trait]
impl KvStore for FsKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.record_path(key);
        let raw = match fs::read(&path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(CacheError::io(&path, err)),
        };

        let record: FsRecord = serde_json::from_slice(&raw)
            .map_err(|source| CacheError::Corrupt {
                path: path.clone(),
                source,
            })?;

        if record.key != key {
            return Ok(None);
        }
        if record.expires_at <= self.clock.now().unix_timestamp() {
            debug!(target = SOURCE, key, path = %path.display(), "Expired cache file");
            self.delete(key).await?;
            return Ok(None);
        }
        Ok(Some(record.value))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let path = self.record_path(key);
        let record = FsRecord {
            key: key.to_string(),
            expires_at: expiry(self.clock.now(), ttl).unix_timestamp(),
            value,
        };
        let encoded = serde_json::to_vec(&record)?;

        // Each writer stages its own file; the rename swaps it in whole.
        let staging = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        fs::write(&staging, encoded)
            .await
            .map_err(|err| CacheError::io(&staging, err))?;
        if let Err(err) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(CacheError::io(&path, err));
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let path = self.record_path(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CacheError::io(&path, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(datetime!(2024-01-01 00:00 UTC)))
    }

    #[tokio::test]
    async fn memory_store_round_trips_until_expiry() {
        let clock = clock();
        let store = MemoryKvStore::new(clock.clone());

        store.set("posts", "[]".into(), HOUR).await.expect("set");
        assert_eq!(store.get("posts").await.expect("get").as_deref(), Some("[]"));

        clock.advance(HOUR);
        assert_eq!(store.get("posts").await.expect("get"), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn memory_store_overwrites_and_deletes() {
        let store = MemoryKvStore::new(clock());

        store.set("k", "one".into(), HOUR).await.expect("set");
        store.set("k", "two".into(), HOUR).await.expect("set");
        assert_eq!(store.get("k").await.expect("get").as_deref(), Some("two"));

        store.delete("k").await.expect("delete");
        assert_eq!(store.get("k").await.expect("get"), None);
    }

    #[tokio::test]
    async fn fs_store_persists_across_instances() {
        let dir = tempfile::tempdir().expect("tempdir");
        let clock = clock();

        let first = FsKvStore::open(dir.path(), clock.clone())
            .await
            .expect("open");
        first
            .set("site:posts", "payload".into(), HOUR)
            .await
            .expect("set");

        let second = FsKvStore::open(dir.path(), clock.clone())
            .await
            .expect("reopen");
        assert_eq!(
            second.get("site:posts").await.expect("get").as_deref(),
            Some("payload")
        );

        clock.advance(HOUR + Duration::from_secs(1));
        assert_eq!(second.get("site:posts").await.expect("get"), None);
        assert_eq!(
            std::fs::read_dir(dir.path()).expect("read dir").count(),
            0,
            "expired record should be removed"
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn fs_store_concurrent_writers_leave_one_whole_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(FsKvStore::open(dir.path(), clock()).await.expect("open"));

        let writers = (0..16).map(|n| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.set("posts", format!("value-{n}"), HOUR).await })
        });
        for result in futures::future::join_all(writers).await {
            result.expect("join").expect("set");
        }

        let value = store.get("posts").await.expect("get").expect("present");
        assert!(value.starts_with("value-"));
        let files: Vec<_> = std::fs::read_dir(dir.path())
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(files.len(), 1, "staging files left behind: {files:?}");
    }

    #[tokio::test]
    async fn fs_store_reports_corrupt_records() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsKvStore::open(dir.path(), clock()).await.expect("open");
        std::fs::write(store.record_path("posts"), b"not json").expect("write");

        let err = store.get("posts").await.expect_err("corrupt");
        assert!(matches!(err, CacheError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn open_store_honours_backend() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = CacheConfig {
            directory: dir.path().join("cache"),
            ..Default::default()
        };

        config.backend = CacheBackend::None;
        assert!(open_store(&config, clock()).await.expect("open").is_none());

        config.backend = CacheBackend::Fs;
        assert!(open_store(&config, clock()).await.expect("open").is_some());
        assert!(config.directory.is_dir());
    }
}
