//! Error types for tsforge_data.

use thiserror::Error;

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur in data operations.
#[derive(Error, Debug)]
pub enum DataError {
    /// Invalid data shape.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Empty dataset.
    #[error("Dataset is empty")]
    EmptyDataset,

    /// Index out of bounds.
    #[error("Index {index} out of bounds for length {length}")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The length of the collection.
        length: usize,
    },

    /// Instances do not share the same time index.
    #[error("Index mismatch: {0}")]
    IndexMismatch(String),

    /// Required exogenous columns are absent.
    #[error("Missing exogenous columns: {missing:?}")]
    MissingExogenous {
        /// Columns that were expected but not found.
        missing: Vec<String>,
    },

    /// Requested horizon is longer than the predictions cover.
    #[error(
        "Forecast horizon exceeds the maximum: requested offset {requested}, \
         but predictions cover only {max} steps"
    )]
    HorizonExceedsMaximum {
        /// Largest requested offset.
        requested: i64,
        /// Number of predicted steps.
        max: usize,
    },

    /// Batch size error.
    #[error("Invalid batch size: {0}")]
    InvalidBatchSize(String),

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Core error.
    #[error("Core error: {0}")]
    CoreError(#[from] tsforge_core::CoreError),
}
