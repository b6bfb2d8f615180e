//! Add-row draft: local field edits that become one `create` call.

use chrono::NaiveDate;
use grid_schema::{empty_value, FieldValue, Schema};
use grid_types::{ColumnType, FieldMap};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::{refuse, surface};
use crate::{GridClient, GridError};

/// Fields of a record not yet sent.
///
/// A failed submit leaves the draft untouched so it can be fixed and resent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RowDraft {
    fields: FieldMap,
}

impl RowDraft {
    /// Draft seeded with per-column defaults.
    pub fn start(schema: &Schema, today: NaiveDate) -> Self {
        let mut fields = FieldMap::new();
        for col in schema.columns() {
            let value = match col.column_type {
                ColumnType::Date => Some(FieldValue::Date(today)),
                ColumnType::Select => col
                    .option_names()
                    .find(|o| o.to_lowercase().contains("not started"))
                    .or_else(|| col.option_names().next())
                    .map(|o| FieldValue::Choice(o.to_string())),
                _ => empty_value(col),
            };
            if let Some(value) = value.map(|v| v.to_json()) {
                fields.insert(col.name.clone(), value);
            }
        }
        Self { fields }
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn cancel(&mut self) {
        self.fields.clear();
    }

    /// Create the record. Clears the draft on success.
    pub async fn submit(&mut self, client: &GridClient) -> Result<(), GridError> {
        client.create_task(&self.fields).await?;
        self.fields.clear();
        Ok(())
    }

    /// Ask the backend for a category matching the draft's name and add it to the
    /// category field.
    ///
    /// Returns `Ok(None)` without a call when the name is blank.
    pub async fn suggest_category(
        &mut self,
        client: &GridClient,
    ) -> Result<Option<String>, GridError> {
        let snapshot = client.snapshot().await;
        let category = snapshot
            .schema
            .category_column()
            .ok_or_else(|| refuse(GridError::NoCategoryColumn))?;
        let name = snapshot
            .schema
            .identifier_column()
            .and_then(|c| self.fields.get(&c.name))
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default();
        if name.is_empty() {
            debug!("no name to suggest a category for");
            return Ok(None);
        }

        let suggestion = client
            .remote()
            .suggest_category(name)
            .await
            .map_err(surface)?
            .filter(|s| !s.trim().is_empty());
        let Some(suggestion) = suggestion else {
            let message = format!("no category suggested for {name:?}");
            error!(task = name, %message, "category suggestion unavailable");
            return Err(GridError::SuggestionUnavailable(message));
        };

        let slot = self
            .fields
            .entry(category.name.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            *slot = Value::Array(Vec::new());
        }
        if let Value::Array(values) = slot {
            if !values.iter().any(|v| v.as_str() == Some(suggestion.as_str())) {
                values.push(Value::String(suggestion.clone()));
            }
        }
        Ok(Some(suggestion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_store::InMemoryRemoteStore;
    use grid_types::Column;
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn start_fills_defaults() {
        let schema = Schema::new(InMemoryRemoteStore::default_columns());
        let draft = RowDraft::start(&schema, day());
        assert_eq!(draft.get("name"), Some(&json!("")));
        assert_eq!(draft.get("due_date"), Some(&json!("2024-03-09")));
        assert_eq!(draft.get("status"), Some(&json!("not started")));
        assert_eq!(draft.get("category"), Some(&json!([])));
    }

    #[test]
    fn select_falls_back_to_first_option() {
        let schema = Schema::new(vec![
            Column::new("priority", ColumnType::Select, 0).with_options(["low", "high"]),
            Column::new("empty", ColumnType::Select, 1),
        ]);
        let draft = RowDraft::start(&schema, day());
        assert_eq!(draft.get("priority"), Some(&json!("low")));
        assert_eq!(draft.get("empty"), None);
    }

    #[test]
    fn cancel_clears_fields() {
        let mut draft = RowDraft::default();
        draft.set("name", json!("x"));
        draft.cancel();
        assert!(draft.is_empty());
    }
}
