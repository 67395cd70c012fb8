//! # tsforge
//!
//! Neural-network forecasters and classifiers built from three pieces:
//!
//! - **Windowed datasets**: panels cut into (history, future) windows and
//!   batched into burn tensors
//! - **Index reconstruction**: relative network output turned back into
//!   frames indexed by instance and absolute time
//! - **Training adapters**: estimators that build a network from an
//!   architecture, train it for a fixed number of epochs and predict
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tsforge::prelude::*;
//! use burn::backend::{Autodiff, NdArray};
//!
//! let y = PanelFrame::from_panel(
//!     vec!["store".into()], "date", instances, times,
//!     vec!["sales".into()], values,
//! )?;
//!
//! let mut forecaster = NeuralForecaster::<Autodiff<NdArray>, _>::new(
//!     LTSFLinearConfig::new(28),
//!     ForecasterConfig::default().with_num_epochs(50),
//!     Default::default(),
//! );
//! forecaster.fit(&y, None, Some(&ForecastingHorizon::range(7)?))?;
//! let forecast = forecaster.predict(None, None, None)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `backend-ndarray` (default): CPU backend using ndarray
//! - `backend-wgpu`: GPU backend using WGPU
//! - `backend-tch`: PyTorch backend via tch-rs

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub use tsforge_core as core;
pub use tsforge_data as data;
pub use tsforge_models as models;
pub use tsforge_train as train;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use tsforge::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use tsforge_core::{
        ComputeBackend, ForecastingHorizon, Frequency, Seed, Split, TimePoint,
    };

    // Data
    pub use tsforge_data::{
        reconstruct_forecast, ClassificationDataset, InstanceKey, PanelFrame, PanelMeta,
        WindowDataset, WindowLoader, WindowedDataset,
    };

    // Models
    pub use tsforge_models::{
        LTSFLinearConfig, LstmForecasterConfig, NaiveDecoder, RnnClassifierConfig,
    };

    // Training
    pub use tsforge_train::{
        ClassifierConfig, ForecasterConfig, NeuralClassifier, NeuralForecaster, TrainError,
        ZeroShotConfig, ZeroShotForecaster,
    };
}
