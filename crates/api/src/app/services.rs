use std::sync::Arc;

use stockroom_infra::{CatalogQueries, CatalogStore, InMemoryCatalogStore, StockEngine, StoreError};

use crate::config::StoreBackend;

/// Store shared by the engine and the queries.
pub type SharedStore = Arc<dyn CatalogStore>;

/// Everything the handlers need, built once at startup.
pub struct AppServices {
    pub engine: StockEngine<SharedStore>,
    pub queries: CatalogQueries<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore) -> Self {
        Self {
            engine: StockEngine::new(store.clone()),
            queries: CatalogQueries::new(store),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCatalogStore::new()))
    }
}

pub async fn build_services(backend: &StoreBackend) -> Result<AppServices, StoreError> {
    match backend {
        StoreBackend::InMemory => {
            tracing::info!("using in-memory catalog store");
            Ok(AppServices::in_memory())
        }
        StoreBackend::Postgres { database_url } => build_persistent_services(database_url).await,
    }
}

#[cfg(feature = "postgres")]
async fn build_persistent_services(database_url: &str) -> Result<AppServices, StoreError> {
    let store = stockroom_infra::catalog_store::PostgresCatalogStore::connect(database_url).await?;
    tracing::info!("using postgres catalog store");
    Ok(AppServices::new(Arc::new(store)))
}

#[cfg(not(feature = "postgres"))]
async fn build_persistent_services(_database_url: &str) -> Result<AppServices, StoreError> {
    tracing::warn!(
        "USE_PERSISTENT_STORES=true but postgres feature not enabled, falling back to in-memory"
    );
    Ok(AppServices::in_memory())
}
