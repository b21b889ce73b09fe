use std::sync::Arc;

use crate::config::AppConfig;
use crate::external::price_provider::PriceProvider;
use crate::services::response_cache::ResponseCache;
use crate::services::single_flight::SingleFlight;
use crate::store::PriceStore;

/// Everything a request or job needs, built once in `main` and cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PriceStore>,
    pub price_provider: Arc<dyn PriceProvider>,
    pub response_cache: ResponseCache,
    pub in_flight: SingleFlight,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn PriceStore>,
        price_provider: Arc<dyn PriceProvider>,
        config: AppConfig,
    ) -> Self {
        Self {
            store,
            price_provider,
            response_cache: ResponseCache::new(config.cache_ttl),
            in_flight: SingleFlight::new(),
            config: Arc::new(config),
        }
    }
}
