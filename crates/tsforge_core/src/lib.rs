//! # tsforge_core
//!
//! Core types and traits shared by the tsforge crates.
//!
//! This crate provides:
//! - [`Seed`] for deterministic shuffling and initialization
//! - [`TimePoint`] and [`Frequency`] for integer and calendar time indices
//! - [`ForecastingHorizon`] for relative/absolute forecast offsets
//! - [`ForecastBatch`] and [`ClassificationBatch`] tensor batches
//! - Network traits ([`ForecastingNetwork`], [`ClassificationNetwork`]) and the
//!   architecture traits estimators build networks from
//! - [`ComputeBackend`] capability checks
//!
//! ## Shape Convention
//!
//! Panel data follows the convention `(N, T, V)`:
//! - `N`: Instances (independent series)
//! - `T`: Time steps
//! - `V`: Variables/columns
//!
//! Classification inputs arrive as `(N, V, T)` and are transposed per item.
//!
//! ## Example
//!
//! ```rust
//! use tsforge_core::{ForecastingHorizon, Frequency, TimePoint};
//! use chrono::NaiveDate;
//!
//! let cutoff = TimePoint::from(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
//! let freq: Frequency = "D".parse().unwrap();
//! let fh = ForecastingHorizon::relative([1, 2, 3]).unwrap();
//! let absolute = fh.to_absolute(&cutoff, Some(&freq)).unwrap();
//! assert_eq!(absolute.len(), 3);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
mod error;
mod horizon;
mod model_trait;
mod seed;
mod split;
mod tensor;
mod time;

pub use backend::ComputeBackend;
pub use error::{CoreError, Result};
pub use horizon::ForecastingHorizon;
pub use model_trait::{
    ClassificationArchitecture, ClassificationNetwork, ForecastingArchitecture,
    ForecastingNetwork, PretrainedDecoder,
};
pub use seed::Seed;
pub use split::Split;
pub use tensor::{ClassificationBatch, ForecastBatch};
pub use time::{Frequency, FrequencyUnit, TimePoint};
