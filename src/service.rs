//! The session exchange: store a code under an identifier, read it back later.

use std::{sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{error::ExchangeError, store::CodeStore};

/// Lifetime of a stored code unless configured otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(86_400);

/// Key namespace an identifier lives in.
///
/// The deep-link and session flows use different prefixes, so the same
/// identifier in both never collides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// `deeplink:<deviceId>`
    DeepLink,
    /// `session:<sessionId>`
    Session,
}

impl Namespace {
    pub fn prefix(self) -> &'static str {
        match self {
            Namespace::DeepLink => "deeplink",
            Namespace::Session => "session",
        }
    }

    /// The store key for `identifier` in this namespace.
    pub fn key(self, identifier: &str) -> String {
        format!("{}:{}", self.prefix(), identifier)
    }
}

/// Confirmation of a successful [`SessionExchange::store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stored {
    pub identifier: String,
    pub ttl: Duration,
}

/// A code returned by [`SessionExchange::retrieve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieved {
    pub identifier: String,
    pub code: String,
}

/// Fixed liveness payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Bridges a web page and a native app through short-lived codes.
///
/// Cheap to clone; every clone shares the same store handle.
///
/// By default a code can be read any number of times until its TTL runs out.
/// With [`SessionExchange::single_use`] the first successful read removes it.
#[derive(Debug, Clone)]
pub struct SessionExchange {
    store: Arc<dyn CodeStore>,
    ttl: Duration,
    single_use: bool,
}

impl SessionExchange {
    pub fn new(store: impl CodeStore) -> Self {
        Self::from_shared(Arc::new(store))
    }

    pub fn from_shared(store: Arc<dyn CodeStore>) -> Self {
        Self {
            store,
            ttl: DEFAULT_TTL,
            single_use: false,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Consume codes on their first successful read.
    pub fn single_use(mut self, single_use: bool) -> Self {
        self.single_use = single_use;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Writes `code` under `identifier` for the configured TTL.
    ///
    /// Blank values count as missing; in that case the store is not touched.
    pub async fn store(
        &self,
        namespace: Namespace,
        identifier: &str,
        code: &str,
    ) -> Result<Stored, ExchangeError> {
        if is_blank(identifier) || is_blank(code) {
            return Err(ExchangeError::MissingFields);
        }

        let key = namespace.key(identifier);
        self.store.put(&key, code, self.ttl).await?;

        info!(%key, ttl_secs = self.ttl.as_secs(), "Saved code");
        Ok(Stored {
            identifier: identifier.to_owned(),
            ttl: self.ttl,
        })
    }

    /// Reads the live code for `identifier`.
    ///
    /// Unknown and expired identifiers both come back as
    /// [`ExchangeError::NotFound`]; backend trouble is [`ExchangeError::Store`].
    pub async fn retrieve(
        &self,
        namespace: Namespace,
        identifier: &str,
    ) -> Result<Retrieved, ExchangeError> {
        if is_blank(identifier) {
            return Err(ExchangeError::MissingFields);
        }

        let key = namespace.key(identifier);
        let code = if self.single_use {
            self.store.take(&key).await?
        } else {
            self.store.get(&key).await?
        };

        match code {
            Some(code) => {
                debug!(%key, consumed = self.single_use, "Found code");
                Ok(Retrieved {
                    identifier: identifier.to_owned(),
                    code,
                })
            }
            None => Err(ExchangeError::NotFound(key)),
        }
    }

    /// Deletes expired records from stores that keep them around.
    pub async fn purge_expired(&self) -> Result<(), ExchangeError> {
        self.store.delete_expired().await?;
        Ok(())
    }

    pub fn health() -> Health {
        Health {
            status: "ok".to_owned(),
            service: env!("CARGO_PKG_NAME").to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    /// Spawns a task that calls [`SessionExchange::purge_expired`] every
    /// `every`. Failures are logged and the task keeps going.
    pub fn spawn_cleanup_task(&self, every: Duration) -> JoinHandle<()> {
        let exchange = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick fires immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(e) = exchange.purge_expired().await {
                    warn!(error = %e, "Expired code cleanup failed");
                }
            }
        })
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
