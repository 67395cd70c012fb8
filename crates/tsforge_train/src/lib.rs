//! # tsforge_train
//!
//! Training loop and estimator front-ends for tsforge.
//!
//! This crate provides:
//! - Name-keyed optimizer and criterion [`registry`] functions
//! - Differentiable [`losses`] for forecasting and classification
//! - [`Trainer`], a fixed-epoch loop over a [`tsforge_data::WindowLoader`]
//! - [`NeuralForecaster`], [`NeuralClassifier`] and [`ZeroShotForecaster`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use burn::backend::{Autodiff, NdArray};
//! use tsforge_core::ForecastingHorizon;
//! use tsforge_models::LTSFLinearConfig;
//! use tsforge_train::{ForecasterConfig, NeuralForecaster};
//!
//! let mut forecaster = NeuralForecaster::<Autodiff<NdArray>, _>::new(
//!     LTSFLinearConfig::new(24),
//!     ForecasterConfig::default().with_optimizer("AdamW", Default::default()),
//!     Default::default(),
//! );
//! forecaster.fit(&y, None, Some(&ForecastingHorizon::range(6)?))?;
//! let forecast = forecaster.predict(None, None, None)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classifier;
pub mod error;
pub mod forecaster;
mod kwargs;
pub mod losses;
pub mod registry;
pub mod training;
pub mod zero_shot;

pub use classifier::{ClassifierConfig, NeuralClassifier};
pub use error::{Result, TrainError};
pub use forecaster::{ForecasterConfig, NeuralForecaster};
pub use losses::{
    ClassificationCriterion, CrossEntropyLoss, FocalLoss, HuberLoss, L1Loss, MSELoss,
    RegressionCriterion,
};
pub use registry::{
    instantiate_classification_criterion, instantiate_optimizer,
    instantiate_regression_criterion, ConfiguredOptimizer, ModuleOptimizer,
};
pub use training::{Trainer, TrainingOutput};
pub use zero_shot::{ZeroShotConfig, ZeroShotForecaster};
