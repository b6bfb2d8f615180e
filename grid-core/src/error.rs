use grid_schema::ValidationError;
use grid_store::RemoteError;
use thiserror::Error;

/// Everything a grid operation can report back to the user.
///
/// Only `Remote` means a call reached the backend; every other kind is raised
/// locally before anything is sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("column {0} already exists")]
    DuplicateColumn(String),
    #[error("column {0} needs at least one option")]
    MissingOptions(String),
    #[error("no category suggestion: {0}")]
    SuggestionUnavailable(String),
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("column name is required")]
    BlankColumnName,
    #[error("no category column defined")]
    NoCategoryColumn,
    #[error("unknown option: {0}")]
    UnknownOption(String),
    #[error("option {0} already exists")]
    DuplicateOption(String),
    #[error("option name is required")]
    BlankOptionName,
}

impl GridError {
    /// Whether the failure happened before any network call.
    pub fn is_local(&self) -> bool {
        !matches!(self, GridError::Remote(_) | GridError::SuggestionUnavailable(_))
    }
}

/// Log a caught remote failure at the synchronizer boundary.
pub(crate) fn surface(err: RemoteError) -> GridError {
    tracing::error!(op = err.op, message = %err.message, "remote call failed");
    GridError::Remote(err)
}

/// Log a locally refused operation.
pub(crate) fn refuse(err: impl Into<GridError>) -> GridError {
    let err = err.into();
    tracing::warn!(error = %err, "operation refused locally");
    err
}
