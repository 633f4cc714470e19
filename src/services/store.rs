use crate::models::{Listing, Profile, WatcherConfig};
use crate::services::{
    appwrite::{AppwriteClient, AppwriteError},
    cache::{CacheKey, CacheManager},
    local::{LocalJsonStore, LocalStoreError},
    postgres::{PostgresClient, PostgresError},
};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from any profile/listing source or notified-match store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Local store error: {0}")]
    Local(#[from] LocalStoreError),

    #[error("Appwrite error: {0}")]
    Appwrite(#[from] AppwriteError),

    #[error("Postgres error: {0}")]
    Postgres(#[from] PostgresError),
}

/// Where profiles and listings come from
pub enum DocumentSource {
    Local(LocalJsonStore),
    Appwrite(AppwriteClient),
}

impl DocumentSource {
    pub fn backend(&self) -> &'static str {
        match self {
            DocumentSource::Local(_) => "local",
            DocumentSource::Appwrite(_) => "appwrite",
        }
    }

    pub async fn fetch_all_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        Ok(match self {
            DocumentSource::Local(store) => store.fetch_all_profiles().await?,
            DocumentSource::Appwrite(client) => client.list_profiles().await?,
        })
    }

    pub async fn fetch_all_listings(&self) -> Result<Vec<Listing>, StoreError> {
        Ok(match self {
            DocumentSource::Local(store) => store.fetch_all_listings().await?,
            DocumentSource::Appwrite(client) => client.list_listings().await?,
        })
    }

    pub async fn fetch_by_id(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        Ok(match self {
            DocumentSource::Local(store) => store.fetch_by_id(id).await?,
            DocumentSource::Appwrite(client) => client.get_profile(id).await?,
        })
    }
}

/// Profile and listing pools, served from cache when warm
pub struct PoolLoader {
    source: DocumentSource,
    cache: CacheManager,
}

impl PoolLoader {
    pub fn new(source: DocumentSource, cache: CacheManager) -> Self {
        Self { source, cache }
    }

    pub fn source(&self) -> &DocumentSource {
        &self.source
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub async fn profiles(&self) -> Result<Vec<Profile>, StoreError> {
        let key = CacheKey::profile_pool();
        if let Ok(profiles) = self.cache.get::<Vec<Profile>>(&key).await {
            return Ok(profiles);
        }

        let profiles = self.source.fetch_all_profiles().await?;
        if let Err(e) = self.cache.set(&key, &profiles).await {
            tracing::warn!("Failed to cache profile pool: {}", e);
        }
        Ok(profiles)
    }

    pub async fn listings(&self) -> Result<Vec<Listing>, StoreError> {
        let key = CacheKey::listing_pool();
        if let Ok(listings) = self.cache.get::<Vec<Listing>>(&key).await {
            return Ok(listings);
        }

        let listings = self.source.fetch_all_listings().await?;
        if let Err(e) = self.cache.set(&key, &listings).await {
            tracing::warn!("Failed to cache listing pool: {}", e);
        }
        Ok(listings)
    }

    /// Single profile, looked up through the cache first
    pub async fn profile(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        let key = CacheKey::profile(id);
        if let Ok(profile) = self.cache.get::<Profile>(&key).await {
            return Ok(Some(profile));
        }

        let profile = self.source.fetch_by_id(id).await?;
        if let Some(p) = &profile {
            if let Err(e) = self.cache.set(&key, p).await {
                tracing::warn!("Failed to cache profile {}: {}", id, e);
            }
        }
        Ok(profile)
    }

    /// Sizes of the cached pools, if present
    pub async fn cached_sizes(&self) -> (Option<usize>, Option<usize>) {
        let profiles = self
            .cache
            .get::<Vec<Profile>>(&CacheKey::profile_pool())
            .await
            .ok()
            .map(|p| p.len());
        let listings = self
            .cache
            .get::<Vec<Listing>>(&CacheKey::listing_pool())
            .await
            .ok()
            .map(|l| l.len());
        (profiles, listings)
    }
}

/// In-process watcher state, lost on restart
#[derive(Debug, Default)]
pub struct MemoryNotifiedStore {
    entries: RwLock<HashMap<(String, String), BTreeSet<String>>>,
    configs: RwLock<HashMap<String, WatcherConfig>>,
}

impl MemoryNotifiedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Where per-seeker notified ids and per-scope watcher configs are kept
pub enum NotifiedStore {
    Memory(MemoryNotifiedStore),
    Postgres(PostgresClient),
}

impl NotifiedStore {
    pub async fn fetch_notified_matches(
        &self,
        scope: &str,
        profile_key: &str,
    ) -> Result<HashSet<String>, StoreError> {
        match self {
            NotifiedStore::Memory(store) => {
                let entries = store.entries.read().await;
                Ok(entries
                    .get(&(scope.to_string(), profile_key.to_string()))
                    .map(|ids| ids.iter().cloned().collect())
                    .unwrap_or_default())
            }
            NotifiedStore::Postgres(client) => {
                Ok(client.fetch_notified_matches(scope, profile_key).await?)
            }
        }
    }

    /// Watcher override stored for a scope, if any
    pub async fn fetch_watcher_config(&self, scope: &str) -> Result<Option<WatcherConfig>, StoreError> {
        match self {
            NotifiedStore::Memory(store) => Ok(store.configs.read().await.get(scope).cloned()),
            NotifiedStore::Postgres(client) => Ok(client.fetch_watcher_config(scope).await?),
        }
    }

    pub async fn store_watcher_config(
        &self,
        scope: &str,
        config: &WatcherConfig,
    ) -> Result<(), StoreError> {
        match self {
            NotifiedStore::Memory(store) => {
                store
                    .configs
                    .write()
                    .await
                    .insert(scope.to_string(), config.clone());
                Ok(())
            }
            NotifiedStore::Postgres(client) => Ok(client.store_watcher_config(scope, config).await?),
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            NotifiedStore::Memory(_) => "memory",
            NotifiedStore::Postgres(_) => "postgres",
        }
    }

    /// False when the backing database does not answer
    pub async fn health_check(&self) -> bool {
        match self {
            NotifiedStore::Memory(_) => true,
            NotifiedStore::Postgres(client) => client.health_check().await.unwrap_or(false),
        }
    }

    /// Replace the stored set (last write wins)
    pub async fn store_notified_matches(
        &self,
        scope: &str,
        profile_key: &str,
        ids: &[String],
    ) -> Result<(), StoreError> {
        match self {
            NotifiedStore::Memory(store) => {
                let mut entries = store.entries.write().await;
                entries.insert(
                    (scope.to_string(), profile_key.to_string()),
                    ids.iter().cloned().collect(),
                );
                Ok(())
            }
            NotifiedStore::Postgres(client) => {
                Ok(client.store_notified_matches(scope, profile_key, ids).await?)
            }
        }
    }
}
