use thiserror::Error;

/// A raw value failed the type contract of its column.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown column: {0}")]
    UnknownColumn(String),
    #[error("column {column}: expected a string")]
    NotAString { column: String },
    #[error("column {column}: {value:?} is not a calendar date")]
    NotADate { column: String, value: String },
    #[error("column {column}: no options defined")]
    NoOptions { column: String },
    #[error("column {column}: {value:?} is not one of its options")]
    NotAnOption { column: String, value: String },
    #[error("column {column}: expected a list of option names")]
    NotAList { column: String },
    #[error("column {column}: {value:?} selected more than once")]
    DuplicateChoice { column: String, value: String },
}
