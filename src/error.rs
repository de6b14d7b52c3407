//! Error taxonomy for the claim preparation transforms.
//!
//! Every transform aborts on the first error for the whole record set;
//! nothing is retried or skipped row by row.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PrepError {
    /// Reference data (or any input file) could not be read.
    #[error("Resource unavailable: {path:?}: {reason}")]
    ResourceUnavailable { path: PathBuf, reason: String },

    /// An expected column is absent from a record set or row.
    #[error("{context}: missing expected column '{column}'")]
    Schema { column: String, context: String },

    /// A value could not be coerced to the numeric type a column requires.
    #[error("Invalid value in column '{column}' (row {row}): {value}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    /// A value outside a column's declared categorical domain.
    #[error("Value '{value}' is not a known category for column '{column}'")]
    InvalidCategory { column: String, value: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),
}

impl PrepError {
    pub(crate) fn schema(column: &str, context: &str) -> Self {
        PrepError::Schema {
            column: column.to_string(),
            context: context.to_string(),
        }
    }

    pub(crate) fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PrepError::ResourceUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PrepError>;
