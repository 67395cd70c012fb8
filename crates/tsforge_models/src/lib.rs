//! # tsforge_models
//!
//! Reference networks for the tsforge estimators.
//!
//! Each configuration type is an architecture: it implements
//! [`ForecastingArchitecture`](tsforge_core::ForecastingArchitecture) or
//! [`ClassificationArchitecture`](tsforge_core::ClassificationArchitecture)
//! and builds its network once the estimator knows the data shape and
//! horizon.
//!
//! ## Forecasting
//! - [`LTSFLinear`]: one linear map from history to forecast, shared across
//!   variables or per variable
//! - [`LstmForecaster`]: LSTM encoder with a linear head, optional warm-start
//!   label window
//!
//! ## Classification
//! - [`RnnClassifier`]: LSTM over masked input, last step to logits
//!
//! ## Pretrained decoders
//! - [`NaiveDecoder`]: repeats the last observed value, an offline stand-in for
//!   foundation-model weights

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod linear;
mod lstm;
mod naive;
mod rnn_classifier;

pub use linear::{LTSFLinear, LTSFLinearConfig};
pub use lstm::{LstmForecaster, LstmForecasterConfig};
pub use naive::NaiveDecoder;
pub use rnn_classifier::{RnnClassifier, RnnClassifierConfig};
