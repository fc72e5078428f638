//! Error types shared by the library.

use polars::prelude::PolarsError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RumuletError>;

#[derive(Error, Debug)]
pub enum RumuletError {
    /// A row that cannot be turned into a record
    #[error("Malformed record in {source_name} at line {line}: {reason}")]
    MalformedRecord {
        source_name: String,
        line: usize,
        reason: String,
    },

    /// A required table column is absent
    #[error("Column '{column}' not found in {source_name}")]
    MissingColumn { source_name: String, column: String },

    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter { parameter: String, reason: String },

    #[error("Statistics error: {0}")]
    Statistics(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}
