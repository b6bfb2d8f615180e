use std::sync::Arc;

use grid_schema::{Schema, SchemaState};
use grid_types::Task;
use tokio::sync::{Mutex, RwLock};

/// Schema and records as fetched together by one reload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GridSnapshot {
    pub schema: Schema,
    pub tasks: Vec<Task>,
}

impl GridSnapshot {
    pub fn new(schema: Schema, tasks: Vec<Task>) -> Self {
        Self { schema, tasks }
    }

}

/// Local copy of the remote state.
///
/// Readers always see one complete snapshot: a reload swaps schema and records together.
/// Reloads run one at a time, fetch through swap, so a later snapshot is never
/// replaced by an earlier one.
pub struct GridStore {
    schema_state: Mutex<SchemaState>,
    reload: Mutex<()>,
    current: RwLock<Arc<GridSnapshot>>,
}

impl Default for GridStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GridStore {
    pub fn new() -> Self {
        Self {
            schema_state: Mutex::new(SchemaState::Uninitialized),
            reload: Mutex::new(()),
            current: RwLock::new(Arc::new(GridSnapshot::default())),
        }
    }

    pub async fn snapshot(&self) -> Arc<GridSnapshot> {
        Arc::clone(&*self.current.read().await)
    }

    pub(crate) async fn replace(&self, next: Arc<GridSnapshot>) {
        *self.current.write().await = next;
    }

    pub async fn schema_state(&self) -> SchemaState {
        *self.schema_state.lock().await
    }

    pub(crate) fn reload_lock(&self) -> &Mutex<()> {
        &self.reload
    }

    pub(crate) fn schema_state_lock(&self) -> &Mutex<SchemaState> {
        &self.schema_state
    }
}
