use async_trait::async_trait;
use grid_types::{Column, FieldMap, NewColumn, OptionValue, Task};
use thiserror::Error;

pub mod config;
pub use config::{ClientConfig, ConfigError};

pub mod wire;
pub use wire::{AiTaskReply, ColumnUpdate, TaskRef};

pub mod http;
pub use http::HttpRemoteStore;

pub mod memory;
pub use memory::InMemoryRemoteStore;

pub mod suggest;
pub use suggest::{CategorySuggester, KeywordSuggester, NullSuggester};

/// The backend rejected a call, or the call never completed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("remote {op} failed: {message}")]
pub struct RemoteError {
    pub op: &'static str,
    pub message: String,
}

impl RemoteError {
    pub fn new(op: &'static str, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
        }
    }
}

/// The remote source of truth for schema and records.
///
/// One method per backend operation; each issues exactly one call.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Populate the default schema. A no-op when columns already exist.
    async fn init_schema(&self) -> Result<(), RemoteError>;

    async fn get_columns(&self) -> Result<Vec<Column>, RemoteError>;

    async fn add_column(&self, column: &NewColumn) -> Result<(), RemoteError>;

    async fn update_column(&self, update: &ColumnUpdate) -> Result<(), RemoteError>;

    /// Remove a column and strip its field from every record.
    async fn delete_column(&self, name: &str) -> Result<(), RemoteError>;

    async fn get_tasks(&self) -> Result<Vec<Task>, RemoteError>;

    async fn add_task(&self, fields: &FieldMap) -> Result<(), RemoteError>;

    /// Create a record from a name alone; the backend picks its category.
    ///
    /// A backend-side refusal is an `Ok` reply with `success == false`.
    async fn add_task_with_category(&self, task_name: &str) -> Result<AiTaskReply, RemoteError>;

    /// Merge `fields` into the single record that `target` resolves to.
    async fn update_task(&self, target: &TaskRef, fields: &FieldMap) -> Result<(), RemoteError>;

    async fn delete_task(&self, target: &TaskRef) -> Result<(), RemoteError>;

    /// Suggested category option name, if the backend produced one.
    async fn suggest_category(&self, task_name: &str) -> Result<Option<String>, RemoteError>;

    /// Replace the category column's options wholesale.
    async fn update_category_options(&self, options: &[OptionValue]) -> Result<(), RemoteError>;
}

/// Backend that holds nothing and accepts nothing.
pub struct NullRemoteStore;

#[async_trait]
impl RemoteStore for NullRemoteStore {
    async fn init_schema(&self) -> Result<(), RemoteError> {
        Ok(())
    }

    async fn get_columns(&self) -> Result<Vec<Column>, RemoteError> {
        Ok(Vec::new())
    }

    async fn add_column(&self, _column: &NewColumn) -> Result<(), RemoteError> {
        Err(RemoteError::new("add_column", "NullRemoteStore is read-only"))
    }

    async fn update_column(&self, _update: &ColumnUpdate) -> Result<(), RemoteError> {
        Err(RemoteError::new("update_column", "NullRemoteStore is read-only"))
    }

    async fn delete_column(&self, _name: &str) -> Result<(), RemoteError> {
        Err(RemoteError::new("delete_column", "NullRemoteStore is read-only"))
    }

    async fn get_tasks(&self) -> Result<Vec<Task>, RemoteError> {
        Ok(Vec::new())
    }

    async fn add_task(&self, _fields: &FieldMap) -> Result<(), RemoteError> {
        Err(RemoteError::new("add_task", "NullRemoteStore is read-only"))
    }

    async fn add_task_with_category(&self, _task_name: &str) -> Result<AiTaskReply, RemoteError> {
        Ok(AiTaskReply::failed("NullRemoteStore has no suggestion service"))
    }

    async fn update_task(&self, _target: &TaskRef, _fields: &FieldMap) -> Result<(), RemoteError> {
        Err(RemoteError::new("update_task", "NullRemoteStore is read-only"))
    }

    async fn delete_task(&self, _target: &TaskRef) -> Result<(), RemoteError> {
        Err(RemoteError::new("delete_task", "NullRemoteStore is read-only"))
    }

    async fn suggest_category(&self, _task_name: &str) -> Result<Option<String>, RemoteError> {
        Ok(None)
    }

    async fn update_category_options(&self, _options: &[OptionValue]) -> Result<(), RemoteError> {
        Err(RemoteError::new(
            "update_category_options",
            "NullRemoteStore is read-only",
        ))
    }
}
