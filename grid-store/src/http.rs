use std::time::Duration;

use async_trait::async_trait;
use grid_types::{Column, FieldMap, NewColumn, OptionValue, Task};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::wire::{
    CategoryOptionsBody, FieldsBody, NameBody, SuggestReply, TaskNameBody, UpdateTaskBody,
};
use crate::{AiTaskReply, ClientConfig, ColumnUpdate, RemoteError, RemoteStore, TaskRef};

/// Backend reached over HTTP: every operation is `POST {base_url}/walker/<op>`
/// and answers with a `{ "reports": [ ... ] }` envelope.
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct NoArgs {}

impl HttpRemoteStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(cfg: &ClientConfig) -> Result<Self, RemoteError> {
        let mut builder = reqwest::Client::builder();
        if let Some(ms) = cfg.request_timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let client = builder
            .build()
            .map_err(|e| RemoteError::new("connect", format!("http client error: {e}")))?;
        Ok(Self {
            client,
            base_url: cfg.base_url().to_string(),
        })
    }

    /// Issue one call and return the first report, if any.
    async fn call<B>(&self, op: &'static str, body: &B) -> Result<Option<Value>, RemoteError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = format!("{}/walker/{}", self.base_url, op);
        tracing::debug!(op, %url, "remote call");

        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteError::new(op, format!("http error: {e}")))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| RemoteError::new(op, format!("body error: {e}")))?;

        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            let snippet: String = text.trim().chars().take(200).collect();
            return Err(RemoteError::new(
                op,
                format!("http status: {status} {snippet}").trim_end().to_string(),
            ));
        }

        first_report(op, &bytes)
    }

    /// Issue one call whose report is a plain success/failure acknowledgement.
    async fn command<B>(&self, op: &'static str, body: &B) -> Result<(), RemoteError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let report = self.call(op, body).await?;
        check_success(op, report.as_ref())
    }
}

/// First report of an envelope. A missing, null or empty `reports` array is no report.
pub(crate) fn first_report(op: &'static str, body: &[u8]) -> Result<Option<Value>, RemoteError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let envelope: Value = serde_json::from_slice(body)
        .map_err(|e| RemoteError::new(op, format!("parse error: {e}")))?;
    match envelope.get("reports") {
        Some(Value::Array(reports)) => Ok(reports.first().cloned()),
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(RemoteError::new(
            op,
            format!("parse error: reports is not an array: {other}"),
        )),
    }
}

/// A report with `success: false` is a rejection; anything else is accepted.
pub(crate) fn check_success(op: &'static str, report: Option<&Value>) -> Result<(), RemoteError> {
    let Some(report) = report else {
        return Ok(());
    };
    if report.get("success").and_then(Value::as_bool) == Some(false) {
        let message = report
            .get("message")
            .or_else(|| report.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("rejected by backend");
        return Err(RemoteError::new(op, message));
    }
    Ok(())
}

/// Decode `key` of a report; absent means empty.
fn report_list<T: DeserializeOwned>(
    op: &'static str,
    report: Option<Value>,
    key: &str,
) -> Result<Vec<T>, RemoteError> {
    let Some(mut report) = report else {
        return Ok(Vec::new());
    };
    check_success(op, Some(&report))?;
    match report.get_mut(key).map(Value::take) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(list) => serde_json::from_value(list)
            .map_err(|e| RemoteError::new(op, format!("parse error: {e}"))),
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn init_schema(&self) -> Result<(), RemoteError> {
        self.command("init_default_columns", &NoArgs {}).await
    }

    async fn get_columns(&self) -> Result<Vec<Column>, RemoteError> {
        let report = self.call("get_columns", &NoArgs {}).await?;
        report_list("get_columns", report, "columns")
    }

    async fn add_column(&self, column: &NewColumn) -> Result<(), RemoteError> {
        self.command("add_column", column).await
    }

    async fn update_column(&self, update: &ColumnUpdate) -> Result<(), RemoteError> {
        self.command("update_column", update).await
    }

    async fn delete_column(&self, name: &str) -> Result<(), RemoteError> {
        self.command("delete_column", &NameBody { name }).await
    }

    async fn get_tasks(&self) -> Result<Vec<Task>, RemoteError> {
        let report = self.call("get_tasks", &NoArgs {}).await?;
        report_list("get_tasks", report, "tasks")
    }

    async fn add_task(&self, fields: &FieldMap) -> Result<(), RemoteError> {
        self.command("add_task", &FieldsBody { fields }).await
    }

    async fn add_task_with_category(&self, task_name: &str) -> Result<AiTaskReply, RemoteError> {
        const OP: &str = "add_task_with_ai_category";
        let report = self.call(OP, &TaskNameBody { task_name }).await?;
        match report {
            None => Ok(AiTaskReply::default()),
            Some(report) => serde_json::from_value(report)
                .map_err(|e| RemoteError::new(OP, format!("parse error: {e}"))),
        }
    }

    async fn update_task(&self, target: &TaskRef, fields: &FieldMap) -> Result<(), RemoteError> {
        let body = UpdateTaskBody {
            task_id: &target.task_id,
            id_field: &target.id_field,
            fields,
        };
        self.command("update_task", &body).await
    }

    async fn delete_task(&self, target: &TaskRef) -> Result<(), RemoteError> {
        self.command("delete_task", target).await
    }

    async fn suggest_category(&self, task_name: &str) -> Result<Option<String>, RemoteError> {
        const OP: &str = "suggest_category";
        let Some(report) = self.call(OP, &TaskNameBody { task_name }).await? else {
            return Ok(None);
        };
        let reply: SuggestReply = serde_json::from_value(report)
            .map_err(|e| RemoteError::new(OP, format!("parse error: {e}")))?;
        Ok(reply
            .category
            .filter(|c| reply.success && !c.trim().is_empty()))
    }

    async fn update_category_options(&self, options: &[OptionValue]) -> Result<(), RemoteError> {
        self.command(
            "update_category_options",
            &CategoryOptionsBody {
                new_options: options,
            },
        )
        .await
    }
}
