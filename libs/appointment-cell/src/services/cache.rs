// libs/appointment-cell/src/services/cache.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Marks cached views stale. Implementations only have to accept opaque tags.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate(&self, tags: &[String]) -> Result<()>;
}

/// Tags touched by any appointment write for a business.
pub fn appointment_tags(business_id: Uuid) -> Vec<String> {
    vec![
        format!("appointments:{}", business_id),
        format!("dashboard:{}", business_id),
    ]
}

/// Bumps a version counter per tag (`cache:tag:{tag}`); readers embed the
/// current version in their cache keys, so old entries simply stop matching.
pub struct RedisCacheInvalidator {
    pool: Pool,
}

impl RedisCacheInvalidator {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| anyhow!("Failed to create Redis pool: {}", e))?;

        let mut conn = pool.get().await.map_err(|e| anyhow!("Failed to connect to Redis: {}", e))?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis cache invalidator connected");

        Ok(Self { pool })
    }
}

#[async_trait]
impl CacheInvalidator for RedisCacheInvalidator {
    async fn invalidate(&self, tags: &[String]) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(|e| anyhow!("Redis pool error: {}", e))?;
        for tag in tags {
            let version: i64 = conn.incr(format!("cache:tag:{}", tag), 1).await?;
            debug!("Cache tag {} bumped to version {}", tag, version);
        }
        Ok(())
    }
}

/// Used when no Redis is configured.
pub struct LogCacheInvalidator;

#[async_trait]
impl CacheInvalidator for LogCacheInvalidator {
    async fn invalidate(&self, tags: &[String]) -> Result<()> {
        debug!("Cache invalidation (no backend): {}", tags.join(", "));
        Ok(())
    }
}

/// Invalidation failures never fail the write that triggered them.
pub async fn invalidate_quietly(cache: &dyn CacheInvalidator, tags: &[String]) {
    if let Err(e) = cache.invalidate(tags).await {
        warn!("Cache invalidation failed for [{}]: {}", tags.join(", "), e);
    }
}
