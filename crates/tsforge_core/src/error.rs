//! Error types for tsforge_core.

use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur in tsforge_core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Shape mismatch between tensors or arrays.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Frequency string could not be parsed.
    #[error("Invalid frequency '{0}'")]
    InvalidFrequency(String),

    /// A calendar offset could not be represented.
    #[error("Time offset out of range: {0}")]
    TimeOutOfRange(String),

    /// Integer and calendar time points were mixed.
    #[error("Incompatible time points: {0}")]
    IncompatibleTime(String),

    /// A calendar index was used without a frequency.
    #[error("Missing frequency: {0}")]
    MissingFrequency(String),

    /// Invalid forecasting horizon.
    #[error("Invalid forecasting horizon: {0}")]
    InvalidHorizon(String),

    /// In-sample offsets (zero or negative) were requested.
    #[error("in-sample prediction is currently not supported, got offsets {0:?}")]
    InSampleNotSupported(Vec<i64>),

    /// A compute backend was requested that this build does not include.
    #[error("Missing dependency: backend '{backend}' requires the `{feature}` feature")]
    MissingDependency {
        /// Requested backend name.
        backend: String,
        /// Cargo feature that enables it.
        feature: &'static str,
    },

    /// Unknown compute backend name.
    #[error("Unknown backend '{name}'. Valid backends: {valid:?}")]
    UnknownBackend {
        /// Requested name.
        name: String,
        /// Accepted names.
        valid: Vec<&'static str>,
    },

    /// Network construction failed.
    #[error("Failed to build network: {0}")]
    NetworkBuild(String),

    /// Generic error.
    #[error("{0}")]
    Other(String),
}
