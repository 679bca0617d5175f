//! Key-value storage for per-guild settings.
//!
//! The [`Store`] trait is a minimal bucket/key/value interface with get/put
//! semantics. Two backends ship with the core:
//!
//! | Backend | Persistence | Purpose |
//! |---------|-------------|---------|
//! | [`MemoryStore`] | none | tests, throwaway runs |
//! | [`JsonFileStore`] | one JSON document on disk | small single-process bots |
//!
//! Typed access to guild settings goes through [`load_guild_settings`] and
//! [`save_guild_settings`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::StoreResult;

/// Bucket holding [`GuildSettings`] keyed by guild id.
pub const GUILDS_BUCKET: &str = "guilds";

/// Bucket/key/value storage.
#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Returns the value stored under `bucket`/`key`, if any.
    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Option<Value>>;

    /// Stores `value` under `bucket`/`key`, creating the bucket when needed.
    async fn put(&self, bucket: &str, key: &str, value: Value) -> StoreResult<()>;

    /// Removes `bucket`/`key`. Returns `true` if something was removed.
    async fn delete(&self, bucket: &str, key: &str) -> StoreResult<bool>;
}

/// A shared Store trait object.
pub type BoxedStore = Arc<dyn Store>;

type Buckets = BTreeMap<String, BTreeMap<String, Value>>;

// =============================================================================
// MemoryStore
// =============================================================================

/// A non-persistent in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: RwLock<Buckets>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Option<Value>> {
        Ok(self
            .buckets
            .read()
            .get(bucket)
            .and_then(|b| b.get(key))
            .cloned())
    }

    async fn put(&self, bucket: &str, key: &str, value: Value) -> StoreResult<()> {
        self.buckets
            .write()
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        Ok(self
            .buckets
            .write()
            .get_mut(bucket)
            .is_some_and(|b| b.remove(key).is_some()))
    }
}

// =============================================================================
// JsonFileStore
// =============================================================================

/// A store persisted as a single JSON document.
///
/// The whole document is cached in memory and rewritten on every mutation.
/// Writes go to a sibling temporary file first and are then renamed over the
/// target. Mutations are serialized by an async lock and only reach the cache
/// once the file was written, so a failed write changes nothing.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    buckets: tokio::sync::Mutex<Buckets>,
}

impl JsonFileStore {
    /// Opens the store at `path`, loading existing data if the file exists.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        let buckets = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Buckets::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Store file not found, starting empty");
                Buckets::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            buckets: tokio::sync::Mutex::new(buckets),
        })
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, buckets: &Buckets) -> StoreResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(buckets)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(path = %self.path.display(), "Store flushed");
        Ok(())
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn get(&self, bucket: &str, key: &str) -> StoreResult<Option<Value>> {
        let buckets = self.buckets.lock().await;
        Ok(buckets.get(bucket).and_then(|b| b.get(key)).cloned())
    }

    async fn put(&self, bucket: &str, key: &str, value: Value) -> StoreResult<()> {
        let mut buckets = self.buckets.lock().await;
        let mut updated = buckets.clone();
        updated
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.flush(&updated).await?;
        *buckets = updated;
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StoreResult<bool> {
        let mut buckets = self.buckets.lock().await;
        let mut updated = buckets.clone();
        let removed = updated
            .get_mut(bucket)
            .is_some_and(|b| b.remove(key).is_some());
        if removed {
            self.flush(&updated).await?;
            *buckets = updated;
        }
        Ok(removed)
    }
}

// =============================================================================
// Guild settings
// =============================================================================

/// Per-guild settings saved in the [`GUILDS_BUCKET`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildSettings {
    /// Guild-specific command prefix; overrides the global prefix when set.
    #[serde(default)]
    pub prefix: Option<String>,
    /// User ids with elevated access in this guild.
    #[serde(default)]
    pub admins: Vec<String>,
}

impl GuildSettings {
    /// Returns `true` if `user_id` is a guild admin.
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.iter().any(|a| a == user_id)
    }

    /// Returns the prefix override, ignoring an empty string.
    pub fn prefix_override(&self) -> Option<&str> {
        self.prefix.as_deref().filter(|p| !p.is_empty())
    }
}

/// Loads the settings of `guild_id`, or `None` if nothing was saved yet.
pub async fn load_guild_settings(
    store: &dyn Store,
    guild_id: &str,
) -> StoreResult<Option<GuildSettings>> {
    match store.get(GUILDS_BUCKET, guild_id).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

/// Saves the settings of `guild_id`.
pub async fn save_guild_settings(
    store: &dyn Store,
    guild_id: &str,
    settings: &GuildSettings,
) -> StoreResult<()> {
    store
        .put(GUILDS_BUCKET, guild_id, serde_json::to_value(settings)?)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_get_put_delete() {
        let store = MemoryStore::new();
        assert!(store.get("b", "k").await.unwrap().is_none());

        store.put("b", "k", Value::from(3)).await.unwrap();
        assert_eq!(store.get("b", "k").await.unwrap(), Some(Value::from(3)));

        assert!(store.delete("b", "k").await.unwrap());
        assert!(!store.delete("b", "k").await.unwrap());
        assert!(store.get("b", "k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_guild_settings_helpers() {
        let store = MemoryStore::new();
        assert!(load_guild_settings(&store, "g1").await.unwrap().is_none());

        let settings = GuildSettings {
            prefix: Some("?".into()),
            admins: vec!["u1".into()],
        };
        save_guild_settings(&store, "g1", &settings).await.unwrap();

        let loaded = load_guild_settings(&store, "g1").await.unwrap().unwrap();
        assert_eq!(loaded, settings);
        assert!(loaded.is_admin("u1"));
        assert!(!loaded.is_admin("u2"));
        assert_eq!(loaded.prefix_override(), Some("?"));
    }

    #[test]
    fn test_empty_prefix_is_no_override() {
        let settings = GuildSettings {
            prefix: Some(String::new()),
            admins: Vec::new(),
        };
        assert_eq!(settings.prefix_override(), None);
    }

    #[tokio::test]
    async fn test_json_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("guilds.json");

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.put("guilds", "g1", serde_json::json!({"prefix": "$"})).await.unwrap();
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        let settings = load_guild_settings(&reopened, "g1").await.unwrap().unwrap();
        assert_eq!(settings.prefix.as_deref(), Some("$"));

        assert!(reopened.delete("guilds", "g1").await.unwrap());
        let again = JsonFileStore::open(&path).await.unwrap();
        assert!(again.get("guilds", "g1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_json_file_store_failed_write_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guilds.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.put("guilds", "g1", serde_json::json!({"prefix": "!"})).await.unwrap();

        // A directory in place of the temporary file makes every write fail.
        std::fs::create_dir(path.with_extension("json.tmp")).unwrap();

        assert!(store.put("guilds", "g1", serde_json::json!({"prefix": "$"})).await.is_err());
        assert!(store.put("guilds", "g2", serde_json::json!({})).await.is_err());
        assert!(store.delete("guilds", "g1").await.is_err());

        assert_eq!(
            store.get("guilds", "g1").await.unwrap(),
            Some(serde_json::json!({"prefix": "!"}))
        );
        assert!(store.get("guilds", "g2").await.unwrap().is_none());
    }
}
