pub mod api;
pub mod catalog;
pub mod engine;
pub mod labels;
pub mod model;
pub mod store;

use std::sync::Arc;

use axum::Router;
use cabos_blob::BlobStore;
use cabos_core::{Module, ServiceError};
use cabos_sql::SQLStore;

use catalog::Catalog;
use engine::LifecycleEngine;
use labels::LabelRenderer;
use store::InventoryStore;

/// The inventory module: cable types, projects, boxes and their usage ledger.
///
/// Embed this in the server to get the catalog registries, the box lifecycle
/// and the QR labels behind one router.
pub struct InventoryModule {
    catalog: Arc<Catalog>,
    engine: Arc<LifecycleEngine>,
    labels: Arc<LabelRenderer>,
}

impl InventoryModule {
    /// Create the module and initialise its schema.
    pub fn new(sql: Arc<dyn SQLStore>, blobs: Arc<dyn BlobStore>) -> Result<Self, ServiceError> {
        let store = Arc::new(InventoryStore::new(sql)?);
        Ok(Self {
            catalog: Arc::new(Catalog::new(Arc::clone(&store))),
            engine: Arc::new(LifecycleEngine::new(store)),
            labels: Arc::new(LabelRenderer::new(blobs)),
        })
    }
}

impl Module for InventoryModule {
    fn name(&self) -> &str {
        "inventory"
    }

    fn routes(&self) -> Router {
        api::router(
            Arc::clone(&self.catalog),
            Arc::clone(&self.engine),
            Arc::clone(&self.labels),
        )
    }
}
