//! Error types for training and estimation.

use thiserror::Error;

/// Result type alias for training operations.
pub type Result<T> = std::result::Result<T, TrainError>;

/// Errors that can occur while configuring, fitting or predicting.
#[derive(Error, Debug)]
pub enum TrainError {
    /// Optimizer name not in the registry.
    #[error("Unknown optimizer '{name}', expected one of {valid:?}")]
    UnknownOptimizer {
        /// Requested name.
        name: String,
        /// Registered names.
        valid: Vec<String>,
    },

    /// Criterion name not in the registry.
    #[error("Unknown criterion '{name}', expected one of {valid:?}")]
    UnknownCriterion {
        /// Requested name.
        name: String,
        /// Registered names.
        valid: Vec<String>,
    },

    /// Keyword arguments rejected by a registry constructor.
    #[error("Invalid arguments for {target}: {reason}")]
    InvalidKwargs {
        /// Optimizer or criterion being configured.
        target: String,
        /// What was wrong.
        reason: String,
    },

    /// Invalid estimator configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The forecast horizon reaches past what the estimator was fitted for.
    #[error(
        "Forecast horizon {requested} exceeds the maximum horizon {max} the estimator was fitted with"
    )]
    HorizonExceedsMaximum {
        /// Largest requested step.
        requested: i64,
        /// Largest supported step.
        max: usize,
    },

    /// No forecast horizon was given and none is configured.
    #[error("A forecasting horizon is required, pass one to fit or configure a default")]
    MissingHorizon,

    /// Windowing the training data produced no samples.
    #[error(
        "No training windows: series of length {series_length} cannot hold \
         seq_len {seq_len} + pred_len {pred_len} steps"
    )]
    EmptyTrainingSet {
        /// Length of the training series.
        series_length: usize,
        /// History window length.
        seq_len: usize,
        /// Forecast window length.
        pred_len: usize,
    },

    /// The data passed to predict is too short for the network.
    #[error("Insufficient history: {0}")]
    InsufficientHistory(String),

    /// Exogenous data required by the network was not passed.
    #[error("Exogenous data required for columns {0:?}")]
    MissingExogenous(Vec<String>),

    /// Estimator used before `fit`.
    #[error("{0} is not fitted, call fit first")]
    NotFitted(&'static str),

    /// Tensor data could not be read back.
    #[error("Tensor error: {0}")]
    Tensor(String),

    /// Data error.
    #[error("Data error: {0}")]
    Data(#[from] tsforge_data::DataError),

    /// Core error.
    #[error("Core error: {0}")]
    Core(#[from] tsforge_core::CoreError),
}
