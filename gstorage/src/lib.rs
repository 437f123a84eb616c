pub mod catalog;
pub mod cleanup;
pub mod config;
pub mod descriptor;
pub mod errors;
pub mod fetch;
pub mod graph;
pub mod link;
pub mod models;
pub mod sync;
pub mod upsert;
pub mod utils;

use crate::catalog::Catalog;
use crate::config::StorageConfig;
use crate::errors::Result;
use crate::graph::{GraphStore, SqliteGraphStore};
use crate::sync::GraphSynchronizer;
use std::sync::Arc;

/// The main entry point for the `gstorage` library.
///
/// `GStorage` bundles the on-disk pieces a synchronization run needs:
/// - A property graph (`SqliteGraphStore`) mirroring the external resources.
/// - A catalog (`Catalog`) using SQLite to keep run logs and completed-scan markers.
/// - A synchronizer (`GraphSynchronizer`) wired to both.
///
/// # Example
///
/// ```rust,no_run
/// use gstorage::{GStorage, config::StorageConfig};
/// use tempfile::tempdir;
///
/// #[tokio::main]
/// async fn main() {
///     let dir = tempdir().unwrap();
///     let config = StorageConfig::new(dir.path());
///     let storage = GStorage::new(config).await.unwrap();
///
///     // Now you can use storage.synchronizer, storage.store, etc.
/// }
/// ```
pub struct GStorage {
    pub config: StorageConfig,
    pub catalog: Arc<Catalog>,
    pub store: Arc<dyn GraphStore>,
    pub synchronizer: Arc<GraphSynchronizer>,
}

impl GStorage {
    /// Creates the storage directory if needed, opens both SQLite files and
    /// initializes their schemas.
    pub async fn new(config: StorageConfig) -> Result<Self> {
        Self::with_region_concurrency(config, 1).await
    }

    pub async fn with_region_concurrency(config: StorageConfig, limit: usize) -> Result<Self> {
        if let Some(parent) = config.graph_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let catalog = Arc::new(Catalog::new(&config)?);
        catalog.initialize_schema()?;

        let store: Arc<dyn GraphStore> = Arc::new(SqliteGraphStore::open(&config.graph_path)?);

        let synchronizer = Arc::new(
            GraphSynchronizer::new(Arc::clone(&store))
                .with_catalog(Arc::clone(&catalog))
                .with_region_concurrency(limit),
        );

        Ok(Self {
            config,
            catalog,
            store,
            synchronizer,
        })
    }
}
