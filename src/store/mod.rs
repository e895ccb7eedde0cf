//! Expiring key-value storage for session codes.
//!
//! [`CodeStore`] is the seam between the exchange service and whatever keeps
//! the codes alive. Two backends ship with the crate:
//!
//! - [`SeaOrmStore`]: one SQL row per key with an expiry timestamp. Expired
//!   rows are filtered out on read and removed by [`CodeStore::delete_expired`].
//! - `RedisStore` (feature `redis`): native `SETEX` expiry, nothing to purge.
//!
//! Keys arrive already namespaced (`deeplink:<id>`, `session:<id>`); stores
//! treat them as opaque strings.

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;

#[cfg(feature = "redis")]
mod redis_store;
mod sql_store;

#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
pub use sql_store::SeaOrmStore;

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a [`CodeStore`] backend.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The backend rejected or failed an operation.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The backend could not be reached while connecting.
    #[error("Connection error: {0}")]
    Connect(String),
}

/// A key-value store whose entries disappear after a time-to-live.
#[async_trait]
pub trait CodeStore: Debug + Send + Sync + 'static {
    /// Writes `code` under `key`, replacing any previous value and restarting
    /// its TTL.
    async fn put(&self, key: &str, code: &str, ttl: Duration) -> Result<()>;

    /// Reads the live value under `key`. Missing and expired keys are `None`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Reads and removes the live value under `key` in one step.
    async fn take(&self, key: &str) -> Result<Option<String>>;

    /// Removes every expired entry. Backends with native expiry keep the
    /// default no-op.
    async fn delete_expired(&self) -> Result<()> {
        Ok(())
    }
}
