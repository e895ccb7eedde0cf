use std::{fmt, time::Duration};

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use tracing::info;

use super::{CodeStore, Error, Result};

/// A Redis-backed code store.
///
/// Expiry is native: every write is a `SETEX`, so there is nothing to purge.
/// Single-use reads go through `GETDEL` (Redis 6.2+), which keeps the
/// read-and-remove atomic on the server.
///
/// The [`ConnectionManager`] reconnects on its own and is cheap to clone, so
/// each call clones it instead of locking a shared connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Connects to `redis_url` and checks the server answers `PING`.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = Client::open(redis_url).map_err(|e| Error::Connect(e.to_string()))?;
        let mut conn = client
            .get_connection_manager()
            .await
            .map_err(|e| Error::Connect(e.to_string()))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Connect(e.to_string()))?;

        info!("Redis is ready");
        Ok(Self { conn })
    }
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl CodeStore for RedisStore {
    async fn put(&self, key: &str, code: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        // SETEX rejects a zero TTL.
        let seconds = ttl.as_secs().max(1);

        conn.set_ex::<_, _, ()>(key, code, seconds)
            .await
            .map_err(|e| Error::Backend(e.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();

        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| Error::Backend(e.to_string()))
    }

    async fn take(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();

        redis::cmd("GETDEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::Backend(e.to_string()))
    }
}
