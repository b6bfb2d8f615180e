use std::sync::Arc;

use grid_schema::{Schema, SchemaState};
use grid_store::{RemoteError, RemoteStore};
use grid_types::Column;
use tracing::{debug, info};

pub mod admin;
pub mod draft;
pub mod error;
pub mod store;
pub mod sync;
pub mod workflow;

pub use draft::RowDraft;
pub use error::GridError;
pub use store::{GridSnapshot, GridStore};
pub use workflow::{CategoryWorkflow, CommitOutcome, WorkflowState};

use crate::error::surface;

/// Client for one remote grid: wires the remote store to the local snapshot.
///
/// Every successful mutation is followed by a full reload; nothing is patched locally.
pub struct GridClient {
    remote: Arc<dyn RemoteStore>,
    store: GridStore,
}

impl GridClient {
    pub fn new(remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            remote,
            store: GridStore::new(),
        }
    }

    pub fn remote(&self) -> &Arc<dyn RemoteStore> {
        &self.remote
    }

    /// Current schema and records. Empty until the first reload.
    pub async fn snapshot(&self) -> Arc<GridSnapshot> {
        self.store.snapshot().await
    }

    pub async fn schema_state(&self) -> SchemaState {
        self.store.schema_state().await
    }

    /// Re-fetch the whole schema and record set and swap them in together.
    ///
    /// On failure the previous snapshot stays in place. Concurrent reloads queue up;
    /// each one fetches after the previous swap.
    pub async fn reload(&self) -> Result<Arc<GridSnapshot>, GridError> {
        let _guard = self.store.reload_lock().lock().await;
        let columns = self.load_columns().await.map_err(surface)?;
        let tasks = self.remote.get_tasks().await.map_err(surface)?;
        let snapshot = Arc::new(GridSnapshot::new(Schema::new(columns), tasks));
        self.store.replace(Arc::clone(&snapshot)).await;
        info!(
            columns = snapshot.schema.len(),
            tasks = snapshot.tasks.len(),
            "grid reloaded"
        );
        Ok(snapshot)
    }

    /// Fetch columns, initializing the default schema the first time they come back empty.
    async fn load_columns(&self) -> Result<Vec<Column>, RemoteError> {
        let columns = self.remote.get_columns().await?;
        if !columns.is_empty() {
            return Ok(columns);
        }

        let mut state = self.store.schema_state_lock().lock().await;
        if !state.begin_initialization() {
            return Ok(columns);
        }
        debug!("schema empty, initializing defaults");
        // The claim above is never released, so a failed init is not retried.
        let result = self.remote.init_schema().await;
        state.mark_ready();
        drop(state);

        result?;
        self.remote.get_columns().await
    }
}
