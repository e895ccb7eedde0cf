#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::time::Instant;
use deeplink_exchange::{
    config::Config,
    store::{self, CodeStore, SeaOrmStore},
    AppState, SessionExchange,
};

pub async fn sqlite_store() -> SeaOrmStore {
    let store = SeaOrmStore::connect("sqlite::memory:").await.unwrap();
    store.migrate().await.unwrap();
    store
}

pub fn test_config() -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("sqlite::memory:".to_owned()),
        "STRICT_NUMERIC_CODES" => Some("true".to_owned()),
        _ => None,
    })
    .unwrap()
}

pub async fn sqlite_state() -> AppState {
    sqlite_state_with_store().await.0
}

/// The state plus a handle on its store, for inspecting rows.
pub async fn sqlite_state_with_store() -> (AppState, SeaOrmStore) {
    let config = test_config();
    let store = sqlite_store().await;
    let exchange = SessionExchange::new(store.clone()).with_ttl(config.code_ttl);
    (AppState::new(exchange, config), store)
}

pub fn failing_state() -> AppState {
    AppState::new(SessionExchange::new(FailingStore), test_config())
}

/// A store whose backend is always down.
#[derive(Debug)]
pub struct FailingStore;

fn down<T>() -> store::Result<T> {
    Err(store::Error::Backend("connection refused".to_owned()))
}

#[async_trait]
impl CodeStore for FailingStore {
    async fn put(&self, _key: &str, _code: &str, _ttl: Duration) -> store::Result<()> {
        down()
    }

    async fn get(&self, _key: &str) -> store::Result<Option<String>> {
        down()
    }

    async fn take(&self, _key: &str) -> store::Result<Option<String>> {
        down()
    }
}

/// An in-memory store whose expiry follows the tokio clock, so paused-time
/// tests can drive it. Expired entries stay until `delete_expired` runs.
#[derive(Debug, Clone, Default)]
pub struct ClockStore {
    entries: Arc<Mutex<HashMap<String, (String, Instant)>>>,
    purges: Arc<AtomicUsize>,
}

impl ClockStore {
    /// Number of entries held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn purges(&self) -> usize {
        self.purges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeStore for ClockStore {
    async fn put(&self, key: &str, code: &str, ttl: Duration) -> store::Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_owned(), (code.to_owned(), Instant::now() + ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> store::Result<Option<String>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .get(key)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(code, _)| code.clone()))
    }

    async fn take(&self, key: &str) -> store::Result<Option<String>> {
        let code = self.get(key).await?;
        self.entries.lock().unwrap().remove(key);
        Ok(code)
    }

    async fn delete_expired(&self) -> store::Result<()> {
        let now = Instant::now();
        self.entries
            .lock()
            .unwrap()
            .retain(|_, (_, expires)| *expires > now);
        self.purges.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
