use std::sync::Arc;

use crate::{config::Config, service::SessionExchange};

/// Shared handler state. Cloned per request.
#[derive(Debug, Clone)]
pub struct AppState {
    pub exchange: SessionExchange,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(exchange: SessionExchange, config: Config) -> Self {
        Self {
            exchange,
            config: Arc::new(config),
        }
    }
}
