//! Content-addressed cache of lint results.
//!
//! Keys are SHA-256 digests of a canonical JSON rendering (object keys sorted
//! recursively, arrays left in order), so semantically equal inputs always
//! map to the same key regardless of field ordering.

use crate::types::LintResult;

use async_trait::async_trait;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// File name of the persisted cache inside the cache directory.
const CACHE_FILE_NAME: &str = "cache.json";

/// Errors from cache storage.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// IO error reading or writing the cache file.
    #[error("cache IO error at {path}: {source}")]
    Io {
        /// Path involved.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Cache content could not be (de)serialized.
    #[error("cache serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Renders `value` as compact JSON with object keys sorted recursively.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::String(s) => write_string(s, out),
        Value::Null | Value::Bool(_) | Value::Number(_) => {
            let _ = write!(out, "{value}");
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    let _ = write!(out, "{}", Value::String(s.to_string()));
}

/// A stable cache key derived from normalized task inputs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Hashes the canonical form of `value`.
    #[must_use]
    pub fn of(value: &Value) -> Self {
        let digest = Sha256::digest(canonical_json(value).as_bytes());
        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(hex, "{byte:02x}");
        }
        Self(hex)
    }

    /// Returns the hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key/value storage behind the cache.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Looks up a value.
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError>;

    /// Stores a value.
    async fn set(&self, key: &str, value: Value) -> Result<(), CacheError>;

    /// Persists pending writes. No-op for volatile stores.
    async fn flush(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Process-lifetime store, never persisted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), CacheError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Store persisted as a single JSON file, rewritten atomically on flush.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, Value>>,
    dirty: AtomicBool,
}

impl FileStore {
    /// Opens (or starts) the cache file inside `dir`.
    ///
    /// A corrupt cache file is discarded with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing cache file cannot be read.
    pub async fn open(dir: &Path) -> Result<Self, CacheError> {
        let path = dir.join(CACHE_FILE_NAME);
        let entries = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<HashMap<String, Value>>(&content) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("Discarding corrupt cache {}: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(CacheError::Io { path, source: e }),
        };
        debug!("Opened cache {} with {} entries", path.display(), entries.len());
        Ok(Self {
            path,
            entries: RwLock::new(entries),
            dirty: AtomicBool::new(false),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, CacheError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), CacheError> {
        self.entries.write().await.insert(key.to_string(), value);
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    async fn flush(&self) -> Result<(), CacheError> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return Ok(());
        }
        let content = {
            let entries = self.entries.read().await;
            serde_json::to_string(&*entries)?
        };
        let io_err = |source| CacheError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        debug!("Flushed cache to {}", self.path.display());
        Ok(())
    }
}

/// Explicitly constructed cache handle shared by the executor.
#[derive(Clone)]
pub struct LintCache {
    store: Arc<dyn CacheStore>,
}

impl std::fmt::Debug for LintCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LintCache").finish_non_exhaustive()
    }
}

impl Default for LintCache {
    fn default() -> Self {
        Self::memory()
    }
}

impl LintCache {
    /// Wraps an arbitrary store.
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    /// A process-lifetime cache.
    #[must_use]
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Opens the persistent cache in `dir`, or a memory cache when `no_cache`.
    ///
    /// # Errors
    ///
    /// Returns an error if the persistent cache cannot be read.
    pub async fn open(dir: &Path, no_cache: bool) -> Result<Self, CacheError> {
        if no_cache {
            return Ok(Self::memory());
        }
        Ok(Self::new(Arc::new(FileStore::open(dir).await?)))
    }

    /// Looks up a cached result.
    ///
    /// Entries that no longer deserialize are treated as misses.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn get(&self, key: &CacheKey) -> Result<Option<LintResult>, CacheError> {
        let Some(value) = self.store.get(key.as_str()).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", key, e);
                Ok(None)
            }
        }
    }

    /// Stores a result.
    ///
    /// # Errors
    ///
    /// Returns an error if the result cannot be serialized or the store fails.
    pub async fn set(&self, key: &CacheKey, result: &LintResult) -> Result<(), CacheError> {
        let value = serde_json::to_value(result)?;
        self.store.set(key.as_str(), value).await
    }

    /// Persists pending writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn flush(&self) -> Result<(), CacheError> {
        self.store.flush().await
    }
}
