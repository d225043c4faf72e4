//! Application state.

use std::sync::Arc;

use vod_bus::JobBus;
use vod_storage::ObjectStore;
use vod_store::{Store, StoreConfig};

use crate::config::ApiConfig;
use crate::services::DispatchService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Store,
    pub storage: Arc<ObjectStore>,
    pub dispatch: Arc<DispatchService>,
}

impl AppState {
    /// Connect all collaborators from environment configuration.
    pub async fn from_env(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let store_config = StoreConfig::from_env()?;
        let store = Store::connect(&store_config).await?;

        let storage = Arc::new(ObjectStore::from_env()?);
        let bus = Arc::new(JobBus::from_env()?);
        bus.init().await?;

        let dispatch = Arc::new(DispatchService::new(store.clone(), bus));

        Ok(Self {
            config,
            store,
            storage,
            dispatch,
        })
    }
}
