#![forbid(unsafe_code)]

pub mod error;
pub mod registry;

pub use error::ValidationError;
pub use registry::{
    empty_value, field_type, format, is_blank, parse_date, FieldType, FieldValue, Rendered,
};

use grid_types::{Column, ColumnType, FieldMap, OptionValue, Task};
use serde_json::Value;

/// Ordered set of column definitions.
///
/// Columns are kept sorted by `order`, ties broken by name, so display order is total.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Build from backend columns. A repeated name keeps its first definition.
    pub fn new(columns: Vec<Column>) -> Self {
        let mut unique: Vec<Column> = Vec::with_capacity(columns.len());
        for col in columns {
            if !unique.iter().any(|c| c.name == col.name) {
                unique.push(col);
            }
        }
        unique.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        Self { columns: unique }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Column naming a record for remote update/delete: the first `text` column,
    /// else the first column overall.
    pub fn identifier_column(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.column_type == ColumnType::Text)
            .or_else(|| self.columns.first())
    }

    /// `(column, value)` identifying `task`, if its identifier field is filled in.
    pub fn identifier_of<'a>(&'a self, task: &'a Task) -> Option<(&'a str, &'a str)> {
        let col = self.identifier_column()?;
        task.text_field(&col.name).map(|v| (col.name.as_str(), v))
    }

    /// First column of type `category`; target of AI suggestions.
    pub fn category_column(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.column_type == ColumnType::Category)
    }

    /// Order one past every existing column.
    pub fn next_order(&self) -> i64 {
        self.columns.iter().map(|c| c.order + 1).max().unwrap_or(0)
    }

    /// Validate `raw` against the named column.
    pub fn validate(&self, name: &str, raw: &Value) -> Result<FieldValue, ValidationError> {
        let col = self
            .column(name)
            .ok_or_else(|| ValidationError::UnknownColumn(name.to_string()))?;
        registry::validate(col, raw)
    }

    /// Coerce a draft field bag into its wire form.
    ///
    /// Keys that name no column are ignored; blank values are left out.
    pub fn coerce_fields(&self, fields: &FieldMap) -> Result<FieldMap, ValidationError> {
        let mut out = FieldMap::new();
        for (name, raw) in fields {
            let Some(col) = self.column(name) else {
                continue;
            };
            if is_blank(col, raw) {
                continue;
            }
            out.insert(name.clone(), registry::validate(col, raw)?.to_json());
        }
        Ok(out)
    }

    /// Display row for `task`, in column order.
    pub fn render<'a>(&'a self, task: &Task) -> Vec<(&'a Column, Rendered)> {
        self.columns
            .iter()
            .map(|c| (c, format(c, task.field(&c.name))))
            .collect()
    }
}

/// Lifecycle of the one-shot default-schema initialization.
///
/// Moves forward only: `Uninitialized -> Initializing -> Ready`, and is never reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SchemaState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
}

impl SchemaState {
    /// Claim the initialization. Returns `true` for the single caller that may issue it.
    pub fn begin_initialization(&mut self) -> bool {
        if *self == SchemaState::Uninitialized {
            *self = SchemaState::Initializing;
            true
        } else {
            false
        }
    }

    pub fn mark_ready(&mut self) {
        *self = SchemaState::Ready;
    }

    pub fn is_ready(&self) -> bool {
        *self == SchemaState::Ready
    }
}

/// Parse a comma separated option list: trimmed, blanks and repeats dropped.
pub fn parse_options(input: &str) -> Vec<OptionValue> {
    let mut out: Vec<OptionValue> = Vec::new();
    for name in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !out.iter().any(|o| o.name() == name) {
            out.push(OptionValue::plain(name));
        }
    }
    out
}
