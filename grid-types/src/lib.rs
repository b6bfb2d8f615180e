use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Raw field bag of a record as it travels over the wire.
///
/// Values are only ever interpreted through the field type registry in `grid-schema`.
pub type FieldMap = BTreeMap<String, serde_json::Value>;

/// Declared type of a column.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ColumnType {
    Text,
    Select,
    MultiSelect,
    Date,
    /// Multi-valued select whose options carry context for category suggestion.
    Category,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown column type: {0}")]
pub struct UnknownColumnType(pub String);

impl ColumnType {
    pub const ALL: [ColumnType; 5] = [
        ColumnType::Text,
        ColumnType::Select,
        ColumnType::MultiSelect,
        ColumnType::Date,
        ColumnType::Category,
    ];

    /// Canonical lowercase tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Select => "select",
            ColumnType::MultiSelect => "multiselect",
            ColumnType::Date => "date",
            ColumnType::Category => "category",
        }
    }

    /// Types whose values must reference one of the column's options.
    pub const fn is_choice(self) -> bool {
        matches!(
            self,
            ColumnType::Select | ColumnType::MultiSelect | ColumnType::Category
        )
    }

    /// Types whose values are ordered sequences of option names.
    pub const fn is_multi(self) -> bool {
        matches!(self, ColumnType::MultiSelect | ColumnType::Category)
    }
}

impl FromStr for ColumnType {
    type Err = UnknownColumnType;

    /// Tags arrive in arbitrary case from the backend.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let tag = raw.trim().to_lowercase();
        ColumnType::ALL
            .into_iter()
            .find(|t| t.as_str() == tag)
            .ok_or(UnknownColumnType(raw.to_string()))
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl Serialize for ColumnType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColumnType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One allowed value of a choice column.
///
/// Plain options are bare strings on the wire; contextual options are
/// `{name, context}` objects where `context` is handed to the suggestion service.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Plain(String),
    Contextual {
        name: String,
        #[serde(default)]
        context: String,
    },
}

impl OptionValue {
    pub fn plain(name: impl Into<String>) -> Self {
        OptionValue::Plain(name.into())
    }

    pub fn contextual(name: impl Into<String>, context: impl Into<String>) -> Self {
        OptionValue::Contextual {
            name: name.into(),
            context: context.into(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            OptionValue::Plain(name) => name,
            OptionValue::Contextual { name, .. } => name,
        }
    }

    /// Legacy bare strings have an empty context.
    pub fn context(&self) -> &str {
        match self {
            OptionValue::Plain(_) => "",
            OptionValue::Contextual { context, .. } => context,
        }
    }

    /// Structured `{name, context}` form used for category columns.
    pub fn into_contextual(self) -> Self {
        match self {
            OptionValue::Plain(name) => OptionValue::Contextual {
                name,
                context: String::new(),
            },
            contextual => contextual,
        }
    }
}

impl From<&str> for OptionValue {
    fn from(name: &str) -> Self {
        OptionValue::plain(name)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A user-defined column of the grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub options: Vec<OptionValue>,
    #[serde(default)]
    pub order: i64,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType, order: i64) -> Self {
        Self {
            name: name.into(),
            column_type,
            options: Vec::new(),
            order,
        }
    }

    pub fn with_options<I, O>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<OptionValue>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_option(&self, name: &str) -> bool {
        self.options.iter().any(|o| o.name() == name)
    }

    pub fn option_names(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(OptionValue::name)
    }
}

/// Column definition as submitted by `add column`; the backend assigns `order`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub options: Vec<OptionValue>,
}

/// One record of the grid.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub fields: FieldMap,
    #[serde(default)]
    pub created_at: String,
}

impl Task {
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }

    /// Non-empty string held in `column`, if any.
    pub fn text_field(&self, column: &str) -> Option<&str> {
        self.field(column)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}
