//! Field type registry: per-type validation, empty values and display formatting.
//!
//! Every interpretation of a raw field value goes through [`field_type`]; nothing else
//! in the workspace probes the JSON shape of a field.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use grid_types::{Column, ColumnType};
use serde_json::Value;

use crate::ValidationError;

/// A field value that satisfied its column's contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Choice(String),
    MultiChoice(Vec<String>),
}

impl FieldValue {
    /// Wire representation.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(s) | FieldValue::Choice(s) => Value::String(s.clone()),
            FieldValue::Date(d) => Value::String(d.format(ISO_DATE).to_string()),
            FieldValue::MultiChoice(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

/// Display form of a stored value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rendered {
    /// Missing, empty, or referencing options that no longer exist.
    Absent,
    Plain(String),
    Badge(String),
    Badges(Vec<String>),
}

impl fmt::Display for Rendered {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rendered::Absent => f.write_str("-"),
            Rendered::Plain(s) => f.write_str(s),
            Rendered::Badge(s) => write!(f, "[{s}]"),
            Rendered::Badges(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "[{item}]")?;
                }
                Ok(())
            }
        }
    }
}

/// Behaviour of one column type.
pub trait FieldType: Send + Sync {
    /// Check `raw` against the column and coerce it to its canonical form.
    fn validate(&self, column: &Column, raw: &Value) -> Result<FieldValue, ValidationError>;

    /// Value of a freshly created, untouched field. `None` means absent.
    fn empty_value(&self, column: &Column) -> Option<FieldValue>;

    /// Display form of a non-null stored value. Never fails.
    fn format(&self, column: &Column, value: &Value) -> Rendered;
}

const ISO_DATE: &str = "%Y-%m-%d";

pub struct TextField;
pub struct DateField;
pub struct SelectField;
/// Shared by `multiselect` and `category`.
pub struct MultiSelectField;

/// Registry lookup.
pub fn field_type(column_type: ColumnType) -> &'static dyn FieldType {
    match column_type {
        ColumnType::Text => &TextField,
        ColumnType::Date => &DateField,
        ColumnType::Select => &SelectField,
        ColumnType::MultiSelect | ColumnType::Category => &MultiSelectField,
    }
}

pub fn validate(column: &Column, raw: &Value) -> Result<FieldValue, ValidationError> {
    field_type(column.column_type).validate(column, raw)
}

pub fn empty_value(column: &Column) -> Option<FieldValue> {
    field_type(column.column_type).empty_value(column)
}

/// Display form of a possibly missing field.
pub fn format(column: &Column, value: Option<&Value>) -> Rendered {
    match value {
        None | Some(Value::Null) => Rendered::Absent,
        Some(v) => field_type(column.column_type).format(column, v),
    }
}

/// Whether a draft value should be treated as "not filled in" rather than validated.
///
/// Null is always blank; an empty string is blank for columns whose empty value is absent.
pub fn is_blank(column: &Column, raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::String(s) if s.trim().is_empty() => empty_value(column).is_none(),
        _ => false,
    }
}

/// Parse any reasonable calendar date spelling.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, ISO_DATE)
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y/%m/%d"))
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

fn expect_str<'a>(column: &Column, raw: &'a Value) -> Result<&'a str, ValidationError> {
    raw.as_str().ok_or_else(|| ValidationError::NotAString {
        column: column.name.clone(),
    })
}

fn require_options(column: &Column) -> Result<(), ValidationError> {
    if column.options.is_empty() {
        return Err(ValidationError::NoOptions {
            column: column.name.clone(),
        });
    }
    Ok(())
}

fn require_option(column: &Column, value: &str) -> Result<(), ValidationError> {
    if column.has_option(value) {
        Ok(())
    } else {
        Err(ValidationError::NotAnOption {
            column: column.name.clone(),
            value: value.to_string(),
        })
    }
}

impl FieldType for TextField {
    fn validate(&self, column: &Column, raw: &Value) -> Result<FieldValue, ValidationError> {
        expect_str(column, raw).map(|s| FieldValue::Text(s.to_string()))
    }

    fn empty_value(&self, _column: &Column) -> Option<FieldValue> {
        Some(FieldValue::Text(String::new()))
    }

    fn format(&self, _column: &Column, value: &Value) -> Rendered {
        match value {
            Value::String(s) if s.is_empty() => Rendered::Absent,
            Value::String(s) => Rendered::Plain(s.clone()),
            // Left over from a type change; shown as-is until edited.
            other => Rendered::Plain(other.to_string()),
        }
    }
}

impl FieldType for DateField {
    fn validate(&self, column: &Column, raw: &Value) -> Result<FieldValue, ValidationError> {
        let s = expect_str(column, raw)?;
        parse_date(s)
            .map(FieldValue::Date)
            .ok_or_else(|| ValidationError::NotADate {
                column: column.name.clone(),
                value: s.to_string(),
            })
    }

    fn empty_value(&self, _column: &Column) -> Option<FieldValue> {
        None
    }

    fn format(&self, _column: &Column, value: &Value) -> Rendered {
        match value {
            Value::String(s) if s.trim().is_empty() => Rendered::Absent,
            Value::String(s) => match parse_date(s) {
                Some(d) => Rendered::Plain(d.format(ISO_DATE).to_string()),
                None => Rendered::Plain(s.clone()),
            },
            other => Rendered::Plain(other.to_string()),
        }
    }
}

impl FieldType for SelectField {
    fn validate(&self, column: &Column, raw: &Value) -> Result<FieldValue, ValidationError> {
        require_options(column)?;
        let s = expect_str(column, raw)?;
        require_option(column, s)?;
        Ok(FieldValue::Choice(s.to_string()))
    }

    fn empty_value(&self, _column: &Column) -> Option<FieldValue> {
        None
    }

    fn format(&self, column: &Column, value: &Value) -> Rendered {
        match value.as_str() {
            Some(s) if column.has_option(s) => Rendered::Badge(s.to_string()),
            _ => Rendered::Absent,
        }
    }
}

impl FieldType for MultiSelectField {
    fn validate(&self, column: &Column, raw: &Value) -> Result<FieldValue, ValidationError> {
        require_options(column)?;
        let items = raw.as_array().ok_or_else(|| ValidationError::NotAList {
            column: column.name.clone(),
        })?;
        let mut chosen: Vec<String> = Vec::with_capacity(items.len());
        for item in items {
            let s = expect_str(column, item)?;
            require_option(column, s)?;
            if chosen.iter().any(|c| c == s) {
                return Err(ValidationError::DuplicateChoice {
                    column: column.name.clone(),
                    value: s.to_string(),
                });
            }
            chosen.push(s.to_string());
        }
        Ok(FieldValue::MultiChoice(chosen))
    }

    fn empty_value(&self, _column: &Column) -> Option<FieldValue> {
        Some(FieldValue::MultiChoice(Vec::new()))
    }

    fn format(&self, column: &Column, value: &Value) -> Rendered {
        let live: Vec<String> = match value {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| column.has_option(s))
                .map(str::to_string)
                .collect(),
            Value::String(s) if column.has_option(s) => vec![s.clone()],
            _ => Vec::new(),
        };
        if live.is_empty() {
            Rendered::Absent
        } else {
            Rendered::Badges(live)
        }
    }
}
