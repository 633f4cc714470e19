use redis::aio::ConnectionManager;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    RedisError(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache miss: {0}")]
    CacheMiss(String),
}

/// Multi-tier cache manager
///
/// Implements L1 (in-memory) and optional L2 (Redis) caching. L1 is local
/// to the process; L2 is shared across instances. Without Redis the manager
/// runs on L1 alone.
pub struct CacheManager {
    redis: Option<Arc<tokio::sync::Mutex<ConnectionManager>>>,
    l1_cache: moka::future::Cache<String, Vec<u8>>,
    ttl_secs: u64,
}

impl CacheManager {
    /// Create a cache backed by Redis at `redis_url`
    pub async fn new(redis_url: &str, l1_size: u64, ttl_secs: u64) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let redis = redis::aio::ConnectionManager::new(client).await?;

        Ok(Self {
            redis: Some(Arc::new(tokio::sync::Mutex::new(redis))),
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            ttl_secs,
        })
    }

    /// Create an L1-only cache
    pub fn in_memory(l1_size: u64, ttl_secs: u64) -> Self {
        Self {
            redis: None,
            l1_cache: Self::build_l1(l1_size, ttl_secs),
            ttl_secs,
        }
    }

    /// Connect to Redis when configured, falling back to L1 only
    pub async fn connect_or_local(redis_url: Option<&str>, l1_size: u64, ttl_secs: u64) -> Self {
        match redis_url {
            Some(url) => match Self::new(url, l1_size, ttl_secs).await {
                Ok(cache) => {
                    tracing::info!("Redis cache connected");
                    cache
                }
                Err(e) => {
                    tracing::warn!("Redis unavailable, using in-memory cache only: {}", e);
                    Self::in_memory(l1_size, ttl_secs)
                }
            },
            None => Self::in_memory(l1_size, ttl_secs),
        }
    }

    fn build_l1(l1_size: u64, ttl_secs: u64) -> moka::future::Cache<String, Vec<u8>> {
        moka::future::CacheBuilder::new(l1_size)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build()
    }

    pub fn has_redis(&self) -> bool {
        self.redis.is_some()
    }

    /// Get a value from cache (L1 first, then L2)
    pub async fn get<T>(&self, key: &str) -> Result<T, CacheError>
    where
        T: for<'de> Deserialize<'de>,
    {
        if let Some(bytes) = self.l1_cache.get(key).await {
            tracing::trace!("L1 cache hit: {}", key);
            return Ok(serde_json::from_slice(&bytes)?);
        }

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            let value: Option<String> = redis::cmd("GET")
                .arg(key)
                .query_async(&mut *conn)
                .await?;
            drop(conn);

            if let Some(json) = value {
                tracing::trace!("L2 cache hit: {}", key);

                // Populate L1 cache
                self.l1_cache
                    .insert(key.to_string(), json.as_bytes().to_vec())
                    .await;

                return Ok(serde_json::from_str(&json)?);
            }
        }

        tracing::trace!("Cache miss: {}", key);
        Err(CacheError::CacheMiss(key.to_string()))
    }

    /// Set a value in every configured tier
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let json = serde_json::to_string(value)?;

        self.l1_cache
            .insert(key.to_string(), json.as_bytes().to_vec())
            .await;

        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("SETEX")
                .arg(key)
                .arg(self.ttl_secs)
                .arg(json)
                .query_async::<()>(&mut *conn)
                .await?;
        }

        tracing::trace!("Cache set: {}", key);
        Ok(())
    }

    /// Delete a value from every tier
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.l1_cache.invalidate(key).await;
        if let Some(redis) = &self.redis {
            let mut conn = redis.lock().await;
            redis::cmd("DEL")
                .arg(key)
                .query_async::<()>(&mut *conn)
                .await?;
        }
        Ok(())
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            l1_size: self.l1_cache.entry_count(),
            redis_enabled: self.redis.is_some(),
            ttl_secs: self.ttl_secs,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub l1_size: u64,
    pub redis_enabled: bool,
    pub ttl_secs: u64,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Snapshot of the full profile pool
    pub fn profile_pool() -> String {
        "pool:profiles".to_string()
    }

    /// Snapshot of the full listing pool
    pub fn listing_pool() -> String {
        "pool:listings".to_string()
    }

    /// Build a cache key for a single profile
    pub fn profile(id: &str) -> String {
        format!("profile:{}", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Listing, Profile};
    use serde_json::json;

    #[tokio::test]
    async fn test_in_memory_set_get_delete() {
        let cache = CacheManager::in_memory(100, 60);
        assert!(!cache.has_redis());

        cache.set("k", &vec![1, 2, 3]).await.unwrap();
        let value: Vec<i32> = cache.get("k").await.unwrap();
        assert_eq!(value, vec![1, 2, 3]);

        cache.delete("k").await.unwrap();
        assert!(matches!(
            cache.get::<Vec<i32>>("k").await,
            Err(CacheError::CacheMiss(_))
        ));
    }

    #[tokio::test]
    async fn test_pool_snapshot_survives_cache() {
        let cache = CacheManager::in_memory(100, 60);
        let profile: Profile = serde_json::from_value(json!({
            "id": "p1", "city": "Lahore", "budget": "18k", "smoking": "no",
            "sleep_schedule": "early riser",
            "anchor_location": {"label": "FAST", "lat": 31.48, "lng": 74.30}
        }))
        .unwrap();
        let listing: Listing = serde_json::from_value(json!({
            "id": "l1", "city": "Lahore", "rent": "25,000", "status": "open"
        }))
        .unwrap();

        cache.set(&CacheKey::profile_pool(), &vec![profile.clone()]).await.unwrap();
        cache.set(&CacheKey::listing_pool(), &vec![listing.clone()]).await.unwrap();

        let profiles: Vec<Profile> = cache.get(&CacheKey::profile_pool()).await.unwrap();
        let listings: Vec<Listing> = cache.get(&CacheKey::listing_pool()).await.unwrap();
        assert_eq!(profiles, vec![profile]);
        assert_eq!(listings, vec![listing]);
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_back() {
        let cache = CacheManager::connect_or_local(Some("not-a-redis-url"), 10, 60).await;
        assert!(!cache.has_redis());
    }

    #[test]
    fn test_cache_key_builder() {
        assert_eq!(CacheKey::profile_pool(), "pool:profiles");
        assert_eq!(CacheKey::listing_pool(), "pool:listings");
        assert_eq!(CacheKey::profile("user123"), "profile:user123");
    }
}
