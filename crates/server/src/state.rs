use std::sync::Arc;

use pila_core::{Authenticator, Config, PublicConfig, QueueService};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    queue: QueueService,
}

impl AppState {
    pub fn new(config: Config, authenticator: Arc<dyn Authenticator>, queue: QueueService) -> Self {
        Self {
            config,
            authenticator,
            queue,
        }
    }

    pub fn public_config(&self) -> PublicConfig {
        PublicConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn queue(&self) -> &QueueService {
        &self.queue
    }
}
