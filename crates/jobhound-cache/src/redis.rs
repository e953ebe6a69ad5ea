//! Redis backend, for deployments where several processes share one
//! database and must agree on who holds the scan lock.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tracing::info;

use jobhound_core::config::cache::{CacheBackend, RedisCacheConfig};
use jobhound_core::config::database::mask_password;
use jobhound_core::error::{AppError, ErrorKind};
use jobhound_core::result::AppResult;
use jobhound_core::traits::cache::CacheProvider;

#[derive(Clone)]
pub struct RedisCacheProvider {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisCacheProvider {
    /// Open a reconnecting connection. Fails fast if Redis is unreachable.
    pub async fn connect(config: &RedisCacheConfig) -> AppResult<Self> {
        let url = mask_password(&config.url);
        info!(url = %url, "Connecting to Redis");

        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| AppError::with_source(ErrorKind::Configuration, format!("Bad Redis URL {url}"), e))?;
        let conn = ConnectionManager::new(client).await.map_err(redis_err)?;

        Ok(Self {
            conn,
            prefix: config.key_prefix.clone(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

impl std::fmt::Debug for RedisCacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheProvider")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

fn redis_err(e: redis::RedisError) -> AppError {
    AppError::with_source(ErrorKind::Cache, format!("Redis: {e}"), e)
}

/// Compare and delete in one server-side step.
const RELEASE_IF_HELD: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0
"#;

/// Redis rejects `EX 0`.
fn expiry_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheProvider for RedisCacheProvider {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.conn.clone().get(self.key(key)).await.map_err(redis_err)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.conn
            .clone()
            .set_ex::<_, _, ()>(self.key(key), value, expiry_secs(ttl))
            .await
            .map_err(redis_err)
    }

    async fn delete(&self, key: &str) -> AppResult<()> {
        self.conn
            .clone()
            .del::<_, ()>(self.key(key))
            .await
            .map_err(redis_err)
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.conn.clone().exists(self.key(key)).await.map_err(redis_err)
    }

    async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> AppResult<bool> {
        // SET .. NX replies OK when written and nil when the key was taken.
        let reply: Option<String> = redis::cmd("SET")
            .arg(self.key(key))
            .arg(value)
            .arg("EX")
            .arg(expiry_secs(ttl))
            .arg("NX")
            .query_async(&mut self.conn.clone())
            .await
            .map_err(redis_err)?;
        Ok(reply.is_some())
    }

    async fn delete_if_eq(&self, key: &str, value: &str) -> AppResult<bool> {
        let removed: i64 = redis::Script::new(RELEASE_IF_HELD)
            .key(self.key(key))
            .arg(value)
            .invoke_async(&mut self.conn.clone())
            .await
            .map_err(redis_err)?;
        Ok(removed == 1)
    }

    async fn health_check(&self) -> AppResult<bool> {
        let reply: String = redis::cmd("PING")
            .query_async(&mut self.conn.clone())
            .await
            .map_err(redis_err)?;
        Ok(reply == "PONG")
    }

    fn backend(&self) -> CacheBackend {
        CacheBackend::Redis
    }
}
