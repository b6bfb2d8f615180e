//! Request and reply payloads of the backend contract.

use grid_types::{ColumnType, FieldMap, OptionValue, Task};
use serde::{Deserialize, Serialize};

/// Partial column change; absent parts stay as they are.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnUpdate {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_type: Option<ColumnType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_options: Option<Vec<OptionValue>>,
}

/// Names one record by the value of its identifier field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub task_id: String,
    pub id_field: String,
}

impl TaskRef {
    pub fn new(task_id: impl Into<String>, id_field: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            id_field: id_field.into(),
        }
    }
}

/// Reply of AI-assisted record creation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AiTaskReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AiTaskReply {
    pub fn created(task: Task) -> Self {
        Self {
            success: true,
            task: Some(task),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            task: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct SuggestReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct NameBody<'a> {
    pub name: &'a str,
}

#[derive(Serialize)]
pub(crate) struct TaskNameBody<'a> {
    pub task_name: &'a str,
}

#[derive(Serialize)]
pub(crate) struct FieldsBody<'a> {
    pub fields: &'a FieldMap,
}

#[derive(Serialize)]
pub(crate) struct UpdateTaskBody<'a> {
    pub task_id: &'a str,
    pub id_field: &'a str,
    pub fields: &'a FieldMap,
}

#[derive(Serialize)]
pub(crate) struct CategoryOptionsBody<'a> {
    pub new_options: &'a [OptionValue],
}
