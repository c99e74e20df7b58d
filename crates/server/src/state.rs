use std::sync::Arc;

use tsuiseki_core::{Config, RefreshScheduler, SeriesCatalog, SubscriptionService};

/// Shared application state
pub struct AppState {
    config: Config,
    service: Arc<SubscriptionService>,
    scheduler: Arc<RefreshScheduler>,
}

impl AppState {
    pub fn new(
        config: Config,
        service: Arc<SubscriptionService>,
        scheduler: Arc<RefreshScheduler>,
    ) -> Self {
        Self {
            config,
            service,
            scheduler,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn service(&self) -> &SubscriptionService {
        self.service.as_ref()
    }

    pub fn catalog(&self) -> &dyn SeriesCatalog {
        self.service.catalog().as_ref()
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        self.scheduler.as_ref()
    }
}
