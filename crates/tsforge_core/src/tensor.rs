//! Batch tensor types handed to networks.

use burn::prelude::*;
use burn::tensor::Bool;

use crate::error::{CoreError, Result};

/// A batch of forecasting windows.
///
/// `inputs` has shape `(batch, seq_len, vars + exog)`: the history window with
/// any exogenous block concatenated along the variable axis. `target` has
/// shape `(batch, label_len + pred_len, vars)` during training and is `None`
/// at inference.
#[derive(Debug, Clone)]
pub struct ForecastBatch<B: Backend> {
    /// Network input `(batch, seq_len, features)`.
    pub inputs: Tensor<B, 3>,

    /// Future window, absent at inference.
    pub target: Option<Tensor<B, 3>>,
}

impl<B: Backend> ForecastBatch<B> {
    /// Create an inference batch without a target.
    pub fn new(inputs: Tensor<B, 3>) -> Self {
        Self {
            inputs,
            target: None,
        }
    }

    /// Create a training batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch sizes differ.
    pub fn with_target(inputs: Tensor<B, 3>, target: Tensor<B, 3>) -> Result<Self> {
        let x_batch = inputs.dims()[0];
        let y_batch = target.dims()[0];

        if x_batch != y_batch {
            return Err(CoreError::ShapeMismatch(format!(
                "inputs batch size {} != target batch size {}",
                x_batch, y_batch
            )));
        }

        Ok(Self {
            inputs,
            target: Some(target),
        })
    }

    /// Get the batch size.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.inputs.dims()[0]
    }

    /// Get the device.
    pub fn device(&self) -> B::Device {
        self.inputs.device()
    }

    /// Move the batch to a device.
    pub fn to_device(self, device: &B::Device) -> Self {
        Self {
            inputs: self.inputs.to_device(device),
            target: self.target.map(|t| t.to_device(device)),
        }
    }
}

/// A batch of classification instances.
///
/// `x` has shape `(batch, time, vars)`; `padding_mask` is `(batch, time)` with
/// `true` marking valid positions.
#[derive(Debug, Clone)]
pub struct ClassificationBatch<B: Backend> {
    /// Instances `(batch, time, vars)`.
    pub x: Tensor<B, 3>,

    /// Valid-position mask `(batch, time)`.
    pub padding_mask: Tensor<B, 2, Bool>,

    /// Class indices, absent at inference.
    pub target: Option<Tensor<B, 1, Int>>,
}

impl<B: Backend> ClassificationBatch<B> {
    /// Create a batch from inputs and their padding mask.
    ///
    /// # Errors
    ///
    /// Returns an error if the mask does not match the first two input dims.
    pub fn new(x: Tensor<B, 3>, padding_mask: Tensor<B, 2, Bool>) -> Result<Self> {
        let [batch, time, _] = x.dims();
        let mask_dims = padding_mask.dims();
        if mask_dims != [batch, time] {
            return Err(CoreError::ShapeMismatch(format!(
                "x shape {:?} does not match padding mask shape {:?}",
                x.dims(),
                mask_dims
            )));
        }
        Ok(Self {
            x,
            padding_mask,
            target: None,
        })
    }

    /// Attach class indices.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of labels differs from the batch size.
    pub fn with_target(mut self, target: Tensor<B, 1, Int>) -> Result<Self> {
        let x_batch = self.batch_size();
        let y_batch = target.dims()[0];
        if x_batch != y_batch {
            return Err(CoreError::ShapeMismatch(format!(
                "x batch size {} != y batch size {}",
                x_batch, y_batch
            )));
        }
        self.target = Some(target);
        Ok(self)
    }

    /// Get the batch size.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.x.dims()[0]
    }

    /// Get the device.
    pub fn device(&self) -> B::Device {
        self.x.device()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_forecast_batch_sizes_checked() {
        let device = Default::default();
        let inputs = Tensor::<TestBackend, 3>::zeros([4, 6, 2], &device);
        let good = Tensor::<TestBackend, 3>::zeros([4, 3, 1], &device);
        let bad = Tensor::<TestBackend, 3>::zeros([3, 3, 1], &device);

        let batch = ForecastBatch::with_target(inputs.clone(), good).unwrap();
        assert_eq!(batch.batch_size(), 4);
        assert!(ForecastBatch::with_target(inputs, bad).is_err());
    }

    #[test]
    fn test_inference_batch_has_no_target() {
        let device = Default::default();
        let batch = ForecastBatch::new(Tensor::<TestBackend, 3>::zeros([1, 6, 1], &device));
        assert!(batch.target.is_none());
    }

    #[test]
    fn test_classification_mask_shape_checked() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 3>::zeros([2, 5, 3], &device);
        let mask = Tensor::<TestBackend, 2>::ones([2, 5], &device).equal_elem(1.0);
        let wrong = Tensor::<TestBackend, 2>::ones([2, 4], &device).equal_elem(1.0);

        let batch = ClassificationBatch::new(x.clone(), mask).unwrap();
        let labels = Tensor::<TestBackend, 1, Int>::from_ints([0, 1], &device);
        assert!(batch.clone().with_target(labels).is_ok());
        assert!(ClassificationBatch::new(x, wrong).is_err());
    }
}
