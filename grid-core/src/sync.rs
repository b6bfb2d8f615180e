//! Record synchronizer: create, update and delete records against the remote store.

use grid_store::TaskRef;
use grid_types::{FieldMap, Task};
use serde_json::Value;
use tracing::info;

use crate::error::{refuse, surface};
use crate::{GridClient, GridError};

impl GridClient {
    /// Create a record from a draft field bag.
    ///
    /// Keys naming no column are ignored and blank values left out; every remaining value
    /// must pass its column's contract. The caller keeps its draft if this fails.
    pub async fn create_task(&self, fields: &FieldMap) -> Result<(), GridError> {
        let snapshot = self.snapshot().await;
        let payload = snapshot.schema.coerce_fields(fields).map_err(refuse)?;
        self.remote.add_task(&payload).await.map_err(surface)?;
        info!(fields = payload.len(), "task created");
        self.reload().await?;
        Ok(())
    }

    /// Set one field of the record whose `identifier_column` holds `identifier`.
    ///
    /// The backend must resolve the pair to exactly one record. Repeating the same
    /// update leaves the record unchanged.
    pub async fn update_task(
        &self,
        identifier: &str,
        identifier_column: &str,
        field: &str,
        raw: &Value,
    ) -> Result<(), GridError> {
        let target = self.task_ref(identifier, identifier_column)?;
        let snapshot = self.snapshot().await;
        let value = snapshot.schema.validate(field, raw).map_err(refuse)?;

        let mut fields = FieldMap::new();
        fields.insert(field.to_string(), value.to_json());
        self.remote
            .update_task(&target, &fields)
            .await
            .map_err(surface)?;
        info!(task = %target.task_id, field, "task updated");
        self.reload().await?;
        Ok(())
    }

    pub async fn delete_task(
        &self,
        identifier: &str,
        identifier_column: &str,
    ) -> Result<(), GridError> {
        let target = self.task_ref(identifier, identifier_column)?;
        self.remote.delete_task(&target).await.map_err(surface)?;
        info!(task = %target.task_id, "task deleted");
        self.reload().await?;
        Ok(())
    }

    /// [`delete_task`](Self::delete_task) addressed by a loaded record.
    pub async fn delete_task_record(&self, task: &Task) -> Result<(), GridError> {
        let (column, identifier) = self.identify(task).await?;
        self.delete_task(&identifier, &column).await
    }

    /// Ask the backend to create a record from `name`, choosing its category itself.
    ///
    /// Does not reload; a refusal comes back as `SuggestionUnavailable`.
    pub async fn create_categorized(&self, name: &str) -> Result<Option<Task>, GridError> {
        let reply = self
            .remote
            .add_task_with_category(name)
            .await
            .map_err(surface)?;
        if reply.success {
            info!(task = name, "categorized task created");
            return Ok(reply.task);
        }
        let message = reply
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "Failed to create task".to_string());
        tracing::error!(task = name, %message, "categorized creation rejected");
        Err(GridError::SuggestionUnavailable(message))
    }

    fn task_ref(&self, identifier: &str, identifier_column: &str) -> Result<TaskRef, GridError> {
        if identifier.trim().is_empty() {
            return Err(refuse(GridError::InvalidIdentifier(format!(
                "empty value for {identifier_column}"
            ))));
        }
        Ok(TaskRef::new(identifier, identifier_column))
    }

    async fn identify(&self, task: &Task) -> Result<(String, String), GridError> {
        let snapshot = self.snapshot().await;
        snapshot
            .schema
            .identifier_of(task)
            .map(|(c, v)| (c.to_string(), v.to_string()))
            .ok_or_else(|| refuse(GridError::InvalidIdentifier("no identifier field".into())))
    }
}
