use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use grid_core::{CategoryWorkflow, CommitOutcome, GridClient, GridError, RowDraft, WorkflowState};
use grid_schema::{Rendered, ValidationError};
use grid_store::{
    AiTaskReply, ColumnUpdate, InMemoryRemoteStore, KeywordSuggester, RemoteError, RemoteStore,
    TaskRef,
};
use grid_types::{Column, ColumnType, FieldMap, NewColumn, OptionValue, Task};
use serde_json::json;

/// Forwards to an in-memory backend and counts every call. `get_tasks` can be
/// made to fail, or to stall once after reading its data.
struct InstrumentedRemote {
    inner: InMemoryRemoteStore,
    calls: AtomicUsize,
    stall_next_tasks: AtomicBool,
    fail_tasks: AtomicBool,
}

impl InstrumentedRemote {
    fn new(inner: InMemoryRemoteStore) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
            stall_next_tasks: AtomicBool::new(false),
            fail_tasks: AtomicBool::new(false),
        })
    }

    fn stall_next_tasks(&self) {
        self.stall_next_tasks.store(true, Ordering::SeqCst);
    }

    fn fail_tasks(&self, fail: bool) {
        self.fail_tasks.store(fail, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteStore for InstrumentedRemote {
    async fn init_schema(&self) -> Result<(), RemoteError> {
        self.tick();
        self.inner.init_schema().await
    }

    async fn get_columns(&self) -> Result<Vec<Column>, RemoteError> {
        self.tick();
        self.inner.get_columns().await
    }

    async fn add_column(&self, column: &NewColumn) -> Result<(), RemoteError> {
        self.tick();
        self.inner.add_column(column).await
    }

    async fn update_column(&self, update: &ColumnUpdate) -> Result<(), RemoteError> {
        self.tick();
        self.inner.update_column(update).await
    }

    async fn delete_column(&self, name: &str) -> Result<(), RemoteError> {
        self.tick();
        self.inner.delete_column(name).await
    }

    async fn get_tasks(&self) -> Result<Vec<Task>, RemoteError> {
        self.tick();
        if self.fail_tasks.load(Ordering::SeqCst) {
            return Err(RemoteError::new("get_tasks", "backend unavailable"));
        }
        let tasks = self.inner.get_tasks().await?;
        if self.stall_next_tasks.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        Ok(tasks)
    }

    async fn add_task(&self, fields: &FieldMap) -> Result<(), RemoteError> {
        self.tick();
        self.inner.add_task(fields).await
    }

    async fn add_task_with_category(&self, task_name: &str) -> Result<AiTaskReply, RemoteError> {
        self.tick();
        self.inner.add_task_with_category(task_name).await
    }

    async fn update_task(&self, target: &TaskRef, fields: &FieldMap) -> Result<(), RemoteError> {
        self.tick();
        self.inner.update_task(target, fields).await
    }

    async fn delete_task(&self, target: &TaskRef) -> Result<(), RemoteError> {
        self.tick();
        self.inner.delete_task(target).await
    }

    async fn suggest_category(&self, task_name: &str) -> Result<Option<String>, RemoteError> {
        self.tick();
        self.inner.suggest_category(task_name).await
    }

    async fn update_category_options(&self, options: &[OptionValue]) -> Result<(), RemoteError> {
        self.tick();
        self.inner.update_category_options(options).await
    }
}

/// Backend that answers the AI create path with a fixed reply.
struct ScriptedAiRemote {
    inner: InMemoryRemoteStore,
}

#[async_trait]
impl RemoteStore for ScriptedAiRemote {
    async fn init_schema(&self) -> Result<(), RemoteError> {
        self.inner.init_schema().await
    }
    async fn get_columns(&self) -> Result<Vec<Column>, RemoteError> {
        self.inner.get_columns().await
    }
    async fn add_column(&self, column: &NewColumn) -> Result<(), RemoteError> {
        self.inner.add_column(column).await
    }
    async fn update_column(&self, update: &ColumnUpdate) -> Result<(), RemoteError> {
        self.inner.update_column(update).await
    }
    async fn delete_column(&self, name: &str) -> Result<(), RemoteError> {
        self.inner.delete_column(name).await
    }
    async fn get_tasks(&self) -> Result<Vec<Task>, RemoteError> {
        self.inner.get_tasks().await
    }
    async fn add_task(&self, fields: &FieldMap) -> Result<(), RemoteError> {
        self.inner.add_task(fields).await
    }
    async fn add_task_with_category(&self, _task_name: &str) -> Result<AiTaskReply, RemoteError> {
        let task = Task {
            fields: serde_json::from_value(json!({"name": "Write report", "category": ["Writing"]}))
                .unwrap(),
            created_at: "2024-01-01".into(),
        };
        let columns = self.inner.get_columns().await?;
        self.inner.seed(columns, vec![task.clone()]).await;
        Ok(AiTaskReply::created(task))
    }
    async fn update_task(&self, target: &TaskRef, fields: &FieldMap) -> Result<(), RemoteError> {
        self.inner.update_task(target, fields).await
    }
    async fn delete_task(&self, target: &TaskRef) -> Result<(), RemoteError> {
        self.inner.delete_task(target).await
    }
    async fn suggest_category(&self, task_name: &str) -> Result<Option<String>, RemoteError> {
        self.inner.suggest_category(task_name).await
    }
    async fn update_category_options(&self, options: &[OptionValue]) -> Result<(), RemoteError> {
        self.inner.update_category_options(options).await
    }
}

async fn loaded(remote: Arc<dyn RemoteStore>) -> GridClient {
    let client = GridClient::new(remote);
    client.reload().await.unwrap();
    client
}

fn keyword_backend() -> InMemoryRemoteStore {
    InMemoryRemoteStore::with_suggester(Arc::new(KeywordSuggester))
}

fn fields(value: serde_json::Value) -> FieldMap {
    serde_json::from_value(value).unwrap()
}

#[tokio::test]
async fn select_validation_examples() {
    let backend = InMemoryRemoteStore::new();
    backend
        .seed(
            vec![Column::new("status", ColumnType::Select, 0).with_options(["todo", "done"])],
            Vec::new(),
        )
        .await;
    let client = loaded(Arc::new(backend)).await;
    let snap = client.snapshot().await;
    let schema = &snap.schema;

    assert!(schema.validate("status", &json!("done")).is_ok());
    assert!(matches!(
        schema.validate("status", &json!("archived")),
        Err(ValidationError::NotAnOption { .. })
    ));
}

#[tokio::test]
async fn added_column_sorts_last_with_options() {
    let client = loaded(Arc::new(InMemoryRemoteStore::new())).await;
    let before = client.snapshot().await.schema.next_order();

    client
        .add_column("priority", ColumnType::Select, vec!["low".into(), "high".into()])
        .await
        .unwrap();

    let snap = client.snapshot().await;
    let col = snap.schema.column("priority").unwrap();
    assert!(col.order >= before);
    assert!(snap.schema.columns().iter().all(|c| c.name == "priority" || c.order < col.order));
    assert_eq!(col.option_names().collect::<Vec<_>>(), vec!["low", "high"]);
}

#[tokio::test]
async fn column_admin_refusals_make_no_calls() {
    let remote = InstrumentedRemote::new(InMemoryRemoteStore::new());
    let client = loaded(remote.clone()).await;
    let baseline = remote.calls();

    let err = client.add_column("name", ColumnType::Text, vec![]).await.unwrap_err();
    assert_eq!(err, GridError::DuplicateColumn("name".into()));
    let err = client.add_column("tags", ColumnType::MultiSelect, vec![]).await.unwrap_err();
    assert_eq!(err, GridError::MissingOptions("tags".into()));
    let err = client.add_column("  ", ColumnType::Text, vec![]).await.unwrap_err();
    assert_eq!(err, GridError::BlankColumnName);
    let err = client.delete_column("missing").await.unwrap_err();
    assert_eq!(err, GridError::UnknownColumn("missing".into()));
    let err = client
        .update_column("status", None, Some(vec![]))
        .await
        .unwrap_err();
    assert_eq!(err, GridError::MissingOptions("status".into()));

    assert_eq!(remote.calls(), baseline);
}

#[tokio::test]
async fn delete_category_column_cascades() {
    let client = loaded(Arc::new(keyword_backend())).await;
    client
        .create_task(&fields(json!({"name": "Essay", "category": ["Writing"]})))
        .await
        .unwrap();
    assert!(client.snapshot().await.tasks[0].fields.contains_key("category"));

    client.delete_column("category").await.unwrap();

    let snap = client.snapshot().await;
    assert!(!snap.schema.contains("category"));
    assert!(snap.tasks.iter().all(|t| !t.fields.contains_key("category")));
}

#[tokio::test]
async fn update_is_idempotent() {
    let client = loaded(Arc::new(InMemoryRemoteStore::new())).await;
    client
        .create_task(&fields(json!({"name": "Essay"})))
        .await
        .unwrap();

    for _ in 0..2 {
        client
            .update_task("Essay", "name", "status", &json!("done"))
            .await
            .unwrap();
    }

    let snap = client.snapshot().await;
    assert_eq!(snap.tasks.len(), 1);
    assert_eq!(snap.tasks[0].fields["status"], json!("done"));
}

#[tokio::test]
async fn unresolved_identifier_is_remote_error() {
    let client = loaded(Arc::new(InMemoryRemoteStore::new())).await;
    let err = client
        .update_task("Nothing", "name", "status", &json!("done"))
        .await
        .unwrap_err();
    assert!(matches!(err, GridError::Remote(_)));
    assert!(!err.is_local());
}

#[tokio::test]
async fn blank_identifier_is_refused_before_any_call() {
    let remote = InstrumentedRemote::new(InMemoryRemoteStore::new());
    let client = loaded(remote.clone()).await;
    let baseline = remote.calls();

    let err = client.delete_task("  ", "name").await.unwrap_err();
    assert!(matches!(err, GridError::InvalidIdentifier(_)));
    let err = client
        .update_task("", "name", "status", &json!("done"))
        .await
        .unwrap_err();
    assert!(matches!(err, GridError::InvalidIdentifier(_)));
    let err = client
        .delete_task_record(&Task::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GridError::InvalidIdentifier(_)));

    assert_eq!(remote.calls(), baseline);
}

#[tokio::test]
async fn invalid_value_is_refused_before_any_call() {
    let remote = InstrumentedRemote::new(InMemoryRemoteStore::new());
    let client = loaded(remote.clone()).await;
    let baseline = remote.calls();

    let err = client
        .create_task(&fields(json!({"name": "x", "due_date": "tomorrow"})))
        .await
        .unwrap_err();
    assert!(matches!(err, GridError::Validation(ValidationError::NotADate { .. })));
    assert!(err.is_local());
    assert_eq!(remote.calls(), baseline);
}

#[tokio::test]
async fn unknown_keys_are_ignored_on_create() {
    let client = loaded(Arc::new(InMemoryRemoteStore::new())).await;
    client
        .create_task(&fields(json!({"name": "x", "color": "red"})))
        .await
        .unwrap();
    let snap = client.snapshot().await;
    assert!(!snap.tasks[0].fields.contains_key("color"));
}

#[tokio::test]
async fn blank_quick_add_makes_no_calls() {
    let remote = InstrumentedRemote::new(keyword_backend());
    let client = loaded(remote.clone()).await;
    let baseline = remote.calls();

    let mut wf = CategoryWorkflow::new();
    wf.type_name(" \t ");
    assert_eq!(wf.commit(&client).await.unwrap(), CommitOutcome::Discarded);
    assert_eq!(wf.state(), &WorkflowState::Idle);
    assert_eq!(remote.calls(), baseline);
}

#[tokio::test]
async fn ai_created_record_is_exactly_the_reply() {
    let client = loaded(Arc::new(ScriptedAiRemote {
        inner: InMemoryRemoteStore::new(),
    }))
    .await;

    let mut wf = CategoryWorkflow::new();
    wf.type_name("Write report");
    wf.commit(&client).await.unwrap();

    let snap = client.snapshot().await;
    assert_eq!(snap.tasks.len(), 1);
    assert_eq!(snap.tasks[0].fields["name"], json!("Write report"));
    assert_eq!(snap.tasks[0].fields["category"], json!(["Writing"]));
    assert_eq!(snap.tasks[0].created_at, "2024-01-01");
}

#[tokio::test]
async fn failed_submit_keeps_draft() {
    let backend = InMemoryRemoteStore::new();
    let client = loaded(Arc::new(backend)).await;
    let mut draft = RowDraft::start(&client.snapshot().await.schema, chrono_day());
    draft.set("name", json!("Essay"));
    draft.set("status", json!("archived"));

    let before = draft.clone();
    assert!(draft.submit(&client).await.is_err());
    assert_eq!(draft, before);

    draft.set("status", json!("done"));
    draft.submit(&client).await.unwrap();
    assert!(draft.is_empty());
    assert_eq!(client.snapshot().await.tasks.len(), 1);
}

#[tokio::test]
async fn suggestion_lands_in_draft_once() {
    let client = loaded(Arc::new(keyword_backend())).await;
    let mut draft = RowDraft::start(&client.snapshot().await.schema, chrono_day());

    assert_eq!(draft.suggest_category(&client).await.unwrap(), None);

    draft.set("name", json!("Write report"));
    for _ in 0..2 {
        let got = draft.suggest_category(&client).await.unwrap();
        assert_eq!(got.as_deref(), Some("Writing"));
    }
    assert_eq!(draft.get("category"), Some(&json!(["Writing"])));
}

#[tokio::test]
async fn removed_option_renders_absent() {
    let client = loaded(Arc::new(keyword_backend())).await;
    client
        .create_task(&fields(json!({"name": "Essay", "category": ["Writing"]})))
        .await
        .unwrap();

    client.remove_category_option("Writing").await.unwrap();

    let snap = client.snapshot().await;
    let task = &snap.tasks[0];
    let rendered = snap.schema.render(task);
    let (_, category) = rendered.iter().find(|(c, _)| c.name == "category").unwrap();
    assert_eq!(category, &Rendered::Absent);
    assert!(snap.schema.validate("category", &json!(["Writing"])).is_err());
}

#[tokio::test]
async fn category_option_editing() {
    let client = loaded(Arc::new(keyword_backend())).await;

    client
        .add_category_option(OptionValue::contextual("Fitness", "run gym swim"))
        .await
        .unwrap();
    let snap = client.snapshot().await;
    assert_eq!(
        snap.schema.validate("category", &json!(["Fitness"])).unwrap().to_json(),
        json!(["Fitness"])
    );
    let err = client
        .add_category_option(OptionValue::plain("Fitness"))
        .await
        .unwrap_err();
    assert_eq!(err, GridError::DuplicateOption("Fitness".into()));

    client
        .edit_category_option("Fitness", OptionValue::contextual("Health", "run gym"))
        .await
        .unwrap();
    let err = client.remove_category_option("Fitness").await.unwrap_err();
    assert_eq!(err, GridError::UnknownOption("Fitness".into()));

    let snap = client.snapshot().await;
    let col = snap.schema.category_column().unwrap();
    assert!(col.has_option("Health"));
    assert!(col
        .options
        .iter()
        .all(|o| matches!(o, OptionValue::Contextual { .. })));
}

fn chrono_day() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
}

#[tokio::test]
async fn overlapping_reloads_keep_the_newest_state() {
    let remote = InstrumentedRemote::new(InMemoryRemoteStore::new());
    let client = loaded(remote.clone()).await;
    let first = fields(json!({"name": "first"}));
    let second = fields(json!({"name": "second"}));

    // The first reload reads one task, then stalls while the second task lands.
    remote.stall_next_tasks();
    let (a, b) = tokio::join!(client.create_task(&first), client.create_task(&second));
    a.unwrap();
    b.unwrap();

    assert_eq!(remote.inner.get_tasks().await.unwrap().len(), 2);
    assert_eq!(client.snapshot().await.tasks.len(), 2);
}

#[tokio::test]
async fn rejected_mutation_keeps_previous_snapshot() {
    let client = loaded(Arc::new(InMemoryRemoteStore::new())).await;
    client
        .create_task(&fields(json!({"name": "Essay"})))
        .await
        .unwrap();
    let before = client.snapshot().await;

    let err = client
        .update_task("Nothing", "name", "status", &json!("done"))
        .await
        .unwrap_err();
    assert!(matches!(err, GridError::Remote(_)));
    assert!(Arc::ptr_eq(&before, &client.snapshot().await));
}

#[tokio::test]
async fn failed_reload_keeps_previous_snapshot() {
    let remote = InstrumentedRemote::new(InMemoryRemoteStore::new());
    let client = loaded(remote.clone()).await;
    let before = client.snapshot().await;

    remote.fail_tasks(true);
    let err = client
        .create_task(&fields(json!({"name": "Essay"})))
        .await
        .unwrap_err();
    assert!(matches!(err, GridError::Remote(_)));
    assert!(Arc::ptr_eq(&before, &client.snapshot().await));
    assert!(client.snapshot().await.tasks.is_empty());

    remote.fail_tasks(false);
    let snap = client.reload().await.unwrap();
    assert_eq!(snap.tasks.len(), 1);
}

#[tokio::test]
async fn option_change_leaves_values_in_place() {
    let client = loaded(Arc::new(InMemoryRemoteStore::new())).await;
    client
        .create_task(&fields(json!({"name": "Essay", "status": "done"})))
        .await
        .unwrap();

    client
        .update_column("status", None, Some(vec!["todo".into(), "finished".into()]))
        .await
        .unwrap();

    let snap = client.snapshot().await;
    let col = snap.schema.column("status").unwrap();
    assert_eq!(col.option_names().collect::<Vec<_>>(), vec!["todo", "finished"]);
    let task = &snap.tasks[0];
    assert_eq!(task.fields["status"], json!("done"));
    let rendered = snap.schema.render(task);
    let (_, status) = rendered.iter().find(|(c, _)| c.name == "status").unwrap();
    assert_eq!(status, &Rendered::Absent);
}

#[tokio::test]
async fn type_change_leaves_values_in_place() {
    let client = loaded(Arc::new(keyword_backend())).await;
    client
        .create_task(&fields(json!({"name": "Essay", "category": ["Writing"]})))
        .await
        .unwrap();

    client
        .update_column("category", Some(ColumnType::Select), Some(vec!["Writing".into()]))
        .await
        .unwrap();

    let snap = client.snapshot().await;
    assert_eq!(snap.schema.column("category").unwrap().column_type, ColumnType::Select);
    let task = &snap.tasks[0];
    assert_eq!(task.fields["category"], json!(["Writing"]));
    let rendered = snap.schema.render(task);
    let (_, category) = rendered.iter().find(|(c, _)| c.name == "category").unwrap();
    assert_eq!(category, &Rendered::Absent);
}

#[tokio::test]
async fn blank_option_names_are_refused_before_any_call() {
    let remote = InstrumentedRemote::new(keyword_backend());
    let client = loaded(remote.clone()).await;
    let baseline = remote.calls();
    let options_before = client.snapshot().await.schema.category_column().unwrap().options.len();

    let err = client
        .add_category_option(OptionValue::plain("   "))
        .await
        .unwrap_err();
    assert_eq!(err, GridError::BlankOptionName);
    let err = client
        .edit_category_option("Writing", OptionValue::contextual("  ", "x"))
        .await
        .unwrap_err();
    assert_eq!(err, GridError::BlankOptionName);

    assert_eq!(remote.calls(), baseline);
    let snap = client.snapshot().await;
    assert_eq!(snap.schema.category_column().unwrap().options.len(), options_before);
    assert!(snap.schema.category_column().unwrap().has_option("Writing"));
}

#[tokio::test]
async fn missing_suggestion_is_reported_as_remote_outcome() {
    // The default in-memory backend never suggests anything.
    let client = loaded(Arc::new(InMemoryRemoteStore::new())).await;
    let mut draft = RowDraft::start(&client.snapshot().await.schema, chrono_day());
    draft.set("name", json!("Write report"));

    let err = draft.suggest_category(&client).await.unwrap_err();
    assert!(matches!(err, GridError::SuggestionUnavailable(_)));
    assert!(!err.is_local());
    assert_eq!(draft.get("category"), Some(&json!([])));
}
