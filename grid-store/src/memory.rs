use std::sync::Arc;

use async_trait::async_trait;
use grid_types::{Column, ColumnType, FieldMap, NewColumn, OptionValue, Task};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::suggest::{CategorySuggester, NullSuggester};
use crate::{AiTaskReply, ColumnUpdate, RemoteError, RemoteStore, TaskRef};

/// In-memory reference backend.
///
/// Implements the backend side of the contract (order assignment, cascade delete,
/// single-match identifier resolution, AI-assisted creation) without durability.
pub struct InMemoryRemoteStore {
    inner: Mutex<Inner>,
    suggester: Arc<dyn CategorySuggester>,
}

#[derive(Default)]
struct Inner {
    columns: Vec<Column>,
    tasks: Vec<Task>,
}

impl Default for InMemoryRemoteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRemoteStore {
    /// Empty backend that never suggests a category.
    pub fn new() -> Self {
        Self::with_suggester(Arc::new(NullSuggester))
    }

    pub fn with_suggester(suggester: Arc<dyn CategorySuggester>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            suggester,
        }
    }

    /// Seed columns and records directly (debug/test hook).
    pub async fn seed(&self, columns: Vec<Column>, tasks: Vec<Task>) {
        let mut inner = self.inner.lock().await;
        inner.columns = columns;
        inner.tasks = tasks;
    }

    /// Schema installed by `init_schema`.
    pub fn default_columns() -> Vec<Column> {
        vec![
            Column::new("name", ColumnType::Text, 0),
            Column::new("due_date", ColumnType::Date, 1),
            Column::new("status", ColumnType::Select, 2).with_options([
                "not started",
                "in progress",
                "done",
            ]),
            Column::new("category", ColumnType::Category, 3).with_options([
                OptionValue::contextual("Writing", "write essay report paper draft summary"),
                OptionValue::contextual("Reading", "read chapter book article notes"),
                OptionValue::contextual("Coding", "code program implement debug project"),
                OptionValue::contextual("Studying", "study exam quiz review practice"),
                OptionValue::contextual("Errands", "buy call email pay book appointment"),
            ]),
        ]
    }

    fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }
}

fn choice_needs_options(column_type: ColumnType, options: &[OptionValue]) -> bool {
    column_type.is_choice() && options.is_empty()
}

fn normalize_options(column_type: ColumnType, options: Vec<OptionValue>) -> Vec<OptionValue> {
    if column_type == ColumnType::Category {
        options.into_iter().map(OptionValue::into_contextual).collect()
    } else {
        options
    }
}

impl Inner {
    fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    fn category_column(&self) -> Option<&Column> {
        self.columns
            .iter()
            .filter(|c| c.column_type == ColumnType::Category)
            .min_by_key(|c| c.order)
    }

    fn identifier_column(&self) -> Option<&Column> {
        let mut sorted: Vec<&Column> = self.columns.iter().collect();
        sorted.sort_by_key(|c| c.order);
        sorted
            .iter()
            .find(|c| c.column_type == ColumnType::Text)
            .or_else(|| sorted.first())
            .copied()
    }

    /// Index of the single record whose `id_field` equals `task_id`.
    fn resolve(&self, op: &'static str, target: &TaskRef) -> Result<usize, RemoteError> {
        let matches: Vec<usize> = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| {
                t.fields.get(&target.id_field).and_then(Value::as_str)
                    == Some(target.task_id.as_str())
            })
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [idx] => Ok(*idx),
            [] => Err(RemoteError::new(
                op,
                format!("no task with {} = {:?}", target.id_field, target.task_id),
            )),
            many => Err(RemoteError::new(
                op,
                format!(
                    "{} tasks share {} = {:?}",
                    many.len(),
                    target.id_field,
                    target.task_id
                ),
            )),
        }
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn init_schema(&self) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock().await;
        if inner.columns.is_empty() {
            inner.columns = Self::default_columns();
        }
        Ok(())
    }

    async fn get_columns(&self) -> Result<Vec<Column>, RemoteError> {
        Ok(self.inner.lock().await.columns.clone())
    }

    async fn add_column(&self, column: &NewColumn) -> Result<(), RemoteError> {
        const OP: &str = "add_column";
        let mut inner = self.inner.lock().await;
        if inner.columns.iter().any(|c| c.name == column.name) {
            return Err(RemoteError::new(OP, format!("column {} already exists", column.name)));
        }
        if choice_needs_options(column.column_type, &column.options) {
            return Err(RemoteError::new(OP, format!("column {} needs options", column.name)));
        }
        let order = inner.columns.iter().map(|c| c.order + 1).max().unwrap_or(0);
        inner.columns.push(Column {
            name: column.name.clone(),
            column_type: column.column_type,
            options: normalize_options(column.column_type, column.options.clone()),
            order,
        });
        Ok(())
    }

    async fn update_column(&self, update: &ColumnUpdate) -> Result<(), RemoteError> {
        const OP: &str = "update_column";
        let mut inner = self.inner.lock().await;
        let col = inner
            .column_mut(&update.name)
            .ok_or_else(|| RemoteError::new(OP, format!("no column {}", update.name)))?;
        let column_type = update.new_type.unwrap_or(col.column_type);
        let options = update.new_options.clone().unwrap_or_else(|| col.options.clone());
        if choice_needs_options(column_type, &options) {
            return Err(RemoteError::new(OP, format!("column {} needs options", update.name)));
        }
        col.column_type = column_type;
        col.options = normalize_options(column_type, options);
        Ok(())
    }

    async fn delete_column(&self, name: &str) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock().await;
        let before = inner.columns.len();
        inner.columns.retain(|c| c.name != name);
        if inner.columns.len() == before {
            return Err(RemoteError::new("delete_column", format!("no column {name}")));
        }
        for task in inner.tasks.iter_mut() {
            task.fields.remove(name);
        }
        Ok(())
    }

    async fn get_tasks(&self) -> Result<Vec<Task>, RemoteError> {
        Ok(self.inner.lock().await.tasks.clone())
    }

    async fn add_task(&self, fields: &FieldMap) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock().await;
        inner.tasks.push(Task {
            fields: fields.clone(),
            created_at: Self::now(),
        });
        Ok(())
    }

    async fn add_task_with_category(&self, task_name: &str) -> Result<AiTaskReply, RemoteError> {
        let (id_column, category) = {
            let inner = self.inner.lock().await;
            let Some(id_column) = inner.identifier_column().map(|c| c.name.clone()) else {
                return Ok(AiTaskReply::failed("no columns defined"));
            };
            let Some(category) = inner.category_column().cloned() else {
                return Ok(AiTaskReply::failed("no category column defined"));
            };
            (id_column, category)
        };

        let Some(choice) = self.suggester.suggest(task_name, &category.options).await else {
            return Ok(AiTaskReply::failed(format!(
                "could not suggest a category for {task_name:?}"
            )));
        };

        let mut fields = FieldMap::new();
        fields.insert(id_column, Value::String(task_name.to_string()));
        fields.insert(category.name, Value::Array(vec![Value::String(choice)]));
        let task = Task {
            fields,
            created_at: Self::now(),
        };
        self.inner.lock().await.tasks.push(task.clone());
        Ok(AiTaskReply::created(task))
    }

    async fn update_task(&self, target: &TaskRef, fields: &FieldMap) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock().await;
        let idx = inner.resolve("update_task", target)?;
        let task = &mut inner.tasks[idx];
        for (k, v) in fields {
            task.fields.insert(k.clone(), v.clone());
        }
        Ok(())
    }

    async fn delete_task(&self, target: &TaskRef) -> Result<(), RemoteError> {
        let mut inner = self.inner.lock().await;
        let idx = inner.resolve("delete_task", target)?;
        inner.tasks.remove(idx);
        Ok(())
    }

    async fn suggest_category(&self, task_name: &str) -> Result<Option<String>, RemoteError> {
        let options = {
            let inner = self.inner.lock().await;
            match inner.category_column() {
                Some(c) => c.options.clone(),
                None => return Ok(None),
            }
        };
        Ok(self.suggester.suggest(task_name, &options).await)
    }

    async fn update_category_options(&self, options: &[OptionValue]) -> Result<(), RemoteError> {
        const OP: &str = "update_category_options";
        let mut inner = self.inner.lock().await;
        let name = inner
            .category_column()
            .map(|c| c.name.clone())
            .ok_or_else(|| RemoteError::new(OP, "no category column defined"))?;
        if let Some(col) = inner.column_mut(&name) {
            col.options = normalize_options(ColumnType::Category, options.to_vec());
        }
        Ok(())
    }
}
