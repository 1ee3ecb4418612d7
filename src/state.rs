use std::sync::Arc;

use crate::auth::IdentityProvider;
use crate::config::AppConfig;
use crate::database::Store;
use crate::services::DatasetService;

/// Shared, immutable application state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn Store>,
    pub identity: Arc<dyn IdentityProvider>,
    pub datasets: DatasetService,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn Store>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            config: Arc::new(config),
            datasets: DatasetService::new(store.clone()),
            store,
            identity,
        }
    }
}
