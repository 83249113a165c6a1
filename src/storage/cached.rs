use crate::models::{AliasListing, Page};
use crate::storage::{AliasStore, StorageResult};
use async_trait::async_trait;
use moka::future::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Read-through cache in front of an alias store.
///
/// Only successful resolves are cached, so a freshly created alias is never
/// shadowed by a cached miss. Deletes invalidate the entry before returning,
/// and a resolve that overlapped any delete drops what it just cached.
pub struct CachedAliasStore {
    /// Underlying storage implementation
    inner: Arc<dyn AliasStore>,
    /// alias -> target URL
    read_cache: Cache<String, String>,
    /// Bumped by every delete
    delete_epoch: AtomicU64,
}

impl CachedAliasStore {
    pub fn new(inner: Arc<dyn AliasStore>, max_cache_entries: u64, ttl_secs: u64) -> Self {
        let read_cache = Cache::builder()
            .max_capacity(max_cache_entries)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            inner,
            read_cache,
            delete_epoch: AtomicU64::new(0),
        }
    }

    #[cfg(test)]
    async fn cached(&self, alias: &str) -> Option<String> {
        self.read_cache.get(alias).await
    }
}

#[async_trait]
impl AliasStore for CachedAliasStore {
    async fn create(
        &self,
        target_url: &str,
        alias: &str,
        owner_user_id: i64,
    ) -> StorageResult<i64> {
        let id = self.inner.create(target_url, alias, owner_user_id).await?;

        self.read_cache
            .insert(alias.to_string(), target_url.to_string())
            .await;

        Ok(id)
    }

    async fn resolve(&self, alias: &str) -> StorageResult<String> {
        if let Some(url) = self.read_cache.get(alias).await {
            tracing::trace!(alias = %alias, "alias cache hit");
            return Ok(url);
        }

        let epoch = self.delete_epoch.load(Ordering::SeqCst);
        let url = self.inner.resolve(alias).await?;
        self.read_cache.insert(alias.to_string(), url.clone()).await;

        // The row may have been deleted after it was read
        if self.delete_epoch.load(Ordering::SeqCst) != epoch {
            self.read_cache.invalidate(alias).await;
        }

        Ok(url)
    }

    async fn delete(&self, alias: &str) -> StorageResult<()> {
        let result = self.inner.delete(alias).await;
        self.delete_epoch.fetch_add(1, Ordering::SeqCst);
        // Invalidate even on NotFound: the row is gone either way
        self.read_cache.invalidate(alias).await;
        result
    }

    async fn list_aliases(&self, page: Page) -> StorageResult<Vec<AliasListing>> {
        self.inner.list_aliases(page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{SqliteStorage, Storage, StorageError, UserStore};
    use std::sync::Mutex;
    use tokio::sync::{oneshot, Notify};

    /// Holds the first resolve after its read until released
    struct GatedStore {
        inner: Arc<SqliteStorage>,
        gate: Mutex<Option<oneshot::Receiver<()>>>,
        reached: Notify,
    }

    #[async_trait]
    impl AliasStore for GatedStore {
        async fn create(&self, target_url: &str, alias: &str, owner: i64) -> StorageResult<i64> {
            self.inner.create(target_url, alias, owner).await
        }

        async fn resolve(&self, alias: &str) -> StorageResult<String> {
            let url = self.inner.resolve(alias).await?;
            let gate = self.gate.lock().unwrap().take();
            if let Some(gate) = gate {
                self.reached.notify_one();
                let _ = gate.await;
            }
            Ok(url)
        }

        async fn delete(&self, alias: &str) -> StorageResult<()> {
            self.inner.delete(alias).await
        }

        async fn list_aliases(&self, page: Page) -> StorageResult<Vec<AliasListing>> {
            self.inner.list_aliases(page).await
        }
    }

    async fn setup() -> (Arc<SqliteStorage>, CachedAliasStore, i64) {
        let sqlite = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
        sqlite.init().await.unwrap();
        let owner = sqlite.create_user("owner", "hash").await.unwrap();
        let sqlite = Arc::new(sqlite);
        let cached = CachedAliasStore::new(sqlite.clone(), 100, 60);
        (sqlite, cached, owner)
    }

    #[tokio::test]
    async fn create_primes_cache() {
        let (_, cached, owner) = setup().await;
        cached.create("https://example.com", "abc", owner).await.unwrap();
        assert_eq!(cached.cached("abc").await.as_deref(), Some("https://example.com"));
    }

    #[tokio::test]
    async fn misses_are_not_cached() {
        let (sqlite, cached, owner) = setup().await;
        assert!(matches!(
            cached.resolve("late").await,
            Err(StorageError::NotFound)
        ));

        // Created behind the cache's back
        sqlite.create("https://example.com/late", "late", owner).await.unwrap();
        assert_eq!(cached.resolve("late").await.unwrap(), "https://example.com/late");
    }

    #[tokio::test]
    async fn delete_invalidates_entry() {
        let (_, cached, owner) = setup().await;
        cached.create("https://example.com", "gone", owner).await.unwrap();
        cached.resolve("gone").await.unwrap();

        cached.delete("gone").await.unwrap();

        assert!(cached.cached("gone").await.is_none());
        assert!(matches!(
            cached.resolve("gone").await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_during_resolve_leaves_nothing_cached() {
        let (sqlite, _, owner) = setup().await;
        sqlite.create("https://example.com", "race", owner).await.unwrap();

        let (release, gate) = oneshot::channel();
        let gated = Arc::new(GatedStore {
            inner: sqlite,
            gate: Mutex::new(Some(gate)),
            reached: Notify::new(),
        });
        let cached = Arc::new(CachedAliasStore::new(gated.clone(), 100, 60));

        // Resolve reads the row, then stalls before caching it
        let reader = {
            let cached = Arc::clone(&cached);
            tokio::spawn(async move { cached.resolve("race").await })
        };
        gated.reached.notified().await;

        cached.delete("race").await.unwrap();
        release.send(()).unwrap();

        assert_eq!(reader.await.unwrap().unwrap(), "https://example.com");
        assert!(cached.cached("race").await.is_none());
        assert!(matches!(
            cached.resolve("race").await,
            Err(StorageError::NotFound)
        ));
    }
}
