//! # tsforge_data
//!
//! Data plumbing between tabular panels and burn tensors.
//!
//! This crate provides:
//! - [`PanelFrame`] for (instance..., time) indexed tables and their dense
//!   `(instance, time, variable)` form
//! - [`WindowedDataset`] for sliding (history, future) windows, including the
//!   trailing-window inference variant
//! - [`ClassificationDataset`] for masked classification instances
//! - [`WindowLoader`] for batched iteration with seeded shuffling
//! - [`reconstruct_forecast`] for turning relative predictions back into an
//!   absolute-time frame
//!
//! ## Example
//!
//! ```rust
//! use ndarray::Array3;
//! use tsforge_data::{WindowDataset, WindowedDataset};
//!
//! let panel = Array3::<f32>::zeros((2, 10, 1));
//! let train = WindowedDataset::new(panel.view(), 6, 3).unwrap();
//! assert_eq!(train.len(), 4);
//!
//! let infer = WindowedDataset::inference(panel.view(), 6).unwrap();
//! assert_eq!(infer.len(), 2);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod loader;
mod panel;
mod reconstruct;
mod sampler;
mod window;

pub use error::{DataError, Result};
pub use loader::{WindowLoader, WindowLoaderBuilder, WindowLoaderIter};
pub use panel::{InstanceKey, PanelFrame, PanelIndex, PanelMeta};
pub use reconstruct::reconstruct_forecast;
pub use sampler::{RandomSampler, Sampler, SequentialSampler};
pub use window::{
    assemble_inference_exogenous, ClassificationDataset, ClassificationItem, Collate,
    WindowDataset, WindowPair, WindowedDataset,
};
