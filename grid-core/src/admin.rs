//! Column admin: schema mutations, each followed by a full reload.

use grid_schema::Schema;
use grid_store::ColumnUpdate;
use grid_types::{Column, ColumnType, NewColumn, OptionValue};
use tracing::info;

use crate::error::{refuse, surface};
use crate::{GridClient, GridError};

/// Trim names, drop blanks and repeats, and give each option the shape its column type uses.
fn clean_options(column_type: ColumnType, options: Vec<OptionValue>) -> Vec<OptionValue> {
    let mut out: Vec<OptionValue> = Vec::with_capacity(options.len());
    for opt in options {
        let opt = match opt {
            OptionValue::Plain(name) => OptionValue::Plain(name.trim().to_string()),
            OptionValue::Contextual { name, context } => OptionValue::Contextual {
                name: name.trim().to_string(),
                context,
            },
        };
        if opt.name().is_empty() || out.iter().any(|o| o.name() == opt.name()) {
            continue;
        }
        out.push(opt);
    }
    if column_type == ColumnType::Category {
        out.into_iter().map(OptionValue::into_contextual).collect()
    } else {
        out.into_iter()
            .map(|o| OptionValue::plain(o.name()))
            .collect()
    }
}

fn category_column(schema: &Schema) -> Result<&Column, GridError> {
    schema
        .category_column()
        .ok_or_else(|| refuse(GridError::NoCategoryColumn))
}

impl GridClient {
    /// Add a column. Choice types need at least one option.
    pub async fn add_column(
        &self,
        name: &str,
        column_type: ColumnType,
        options: Vec<OptionValue>,
    ) -> Result<(), GridError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(refuse(GridError::BlankColumnName));
        }
        let snapshot = self.snapshot().await;
        if snapshot.schema.contains(name) {
            return Err(refuse(GridError::DuplicateColumn(name.to_string())));
        }
        let options = clean_options(column_type, options);
        if column_type.is_choice() && options.is_empty() {
            return Err(refuse(GridError::MissingOptions(name.to_string())));
        }

        let column = NewColumn {
            name: name.to_string(),
            column_type,
            options,
        };
        self.remote.add_column(&column).await.map_err(surface)?;
        info!(column = name, kind = column_type.as_str(), "column added");
        self.reload().await?;
        Ok(())
    }

    /// Change a column's type and/or options.
    ///
    /// Existing record values are not re-validated; values that no longer fit render as absent.
    pub async fn update_column(
        &self,
        name: &str,
        new_type: Option<ColumnType>,
        new_options: Option<Vec<OptionValue>>,
    ) -> Result<(), GridError> {
        let snapshot = self.snapshot().await;
        let current = snapshot
            .schema
            .column(name)
            .ok_or_else(|| refuse(GridError::UnknownColumn(name.to_string())))?;
        if new_type.is_none() && new_options.is_none() {
            return Ok(());
        }

        let effective_type = new_type.unwrap_or(current.column_type);
        let new_options = new_options.map(|opts| clean_options(effective_type, opts));
        let resulting = new_options.as_deref().unwrap_or(&current.options);
        if effective_type.is_choice() && resulting.is_empty() {
            return Err(refuse(GridError::MissingOptions(name.to_string())));
        }

        let update = ColumnUpdate {
            name: name.to_string(),
            new_type,
            new_options,
        };
        self.remote.update_column(&update).await.map_err(surface)?;
        info!(column = name, "column updated");
        self.reload().await?;
        Ok(())
    }

    /// Delete a column and its field from every record. Irreversible; confirm before calling.
    pub async fn delete_column(&self, name: &str) -> Result<(), GridError> {
        if !self.snapshot().await.schema.contains(name) {
            return Err(refuse(GridError::UnknownColumn(name.to_string())));
        }
        self.remote.delete_column(name).await.map_err(surface)?;
        info!(column = name, "column deleted");
        self.reload().await?;
        Ok(())
    }

    /// Replace the category column's options with `options`.
    pub async fn update_category_options(
        &self,
        options: Vec<OptionValue>,
    ) -> Result<(), GridError> {
        let snapshot = self.snapshot().await;
        let column = category_column(&snapshot.schema)?;
        let options = clean_options(ColumnType::Category, options);
        if options.is_empty() {
            return Err(refuse(GridError::MissingOptions(column.name.clone())));
        }
        self.remote
            .update_category_options(&options)
            .await
            .map_err(surface)?;
        info!(options = options.len(), "category options replaced");
        self.reload().await?;
        Ok(())
    }

    pub async fn add_category_option(&self, option: OptionValue) -> Result<(), GridError> {
        let name = option.name().trim();
        if name.is_empty() {
            return Err(refuse(GridError::BlankOptionName));
        }
        let mut options = self.category_options().await?;
        if options.iter().any(|o| o.name() == name) {
            return Err(refuse(GridError::DuplicateOption(name.to_string())));
        }
        options.push(option);
        self.update_category_options(options).await
    }

    /// Replace the option named `old`, keeping its position.
    pub async fn edit_category_option(
        &self,
        old: &str,
        replacement: OptionValue,
    ) -> Result<(), GridError> {
        let new_name = replacement.name().trim();
        if new_name.is_empty() {
            return Err(refuse(GridError::BlankOptionName));
        }
        let mut options = self.category_options().await?;
        let idx = options
            .iter()
            .position(|o| o.name() == old)
            .ok_or_else(|| refuse(GridError::UnknownOption(old.to_string())))?;
        if new_name != old && options.iter().any(|o| o.name() == new_name) {
            return Err(refuse(GridError::DuplicateOption(new_name.to_string())));
        }
        options[idx] = replacement;
        self.update_category_options(options).await
    }

    pub async fn remove_category_option(&self, name: &str) -> Result<(), GridError> {
        let mut options = self.category_options().await?;
        let before = options.len();
        options.retain(|o| o.name() != name);
        if options.len() == before {
            return Err(refuse(GridError::UnknownOption(name.to_string())));
        }
        self.update_category_options(options).await
    }

    async fn category_options(&self) -> Result<Vec<OptionValue>, GridError> {
        let snapshot = self.snapshot().await;
        Ok(category_column(&snapshot.schema)?.options.clone())
    }
}
