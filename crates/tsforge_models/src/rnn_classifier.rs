//! LSTM classifier over masked input.

use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, Lstm, LstmConfig};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Bool;
use serde::{Deserialize, Serialize};

use tsforge_core::{ClassificationArchitecture, ClassificationNetwork, CoreError, Result};

/// Configuration for [`RnnClassifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RnnClassifierConfig {
    /// Hidden dimension.
    pub hidden_size: usize,
    /// Dropout rate.
    pub dropout: f64,
}

impl Default for RnnClassifierConfig {
    fn default() -> Self {
        Self {
            hidden_size: 64,
            dropout: 0.1,
        }
    }
}

impl RnnClassifierConfig {
    /// Set the hidden dimension.
    #[must_use]
    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    /// Set dropout rate.
    #[must_use]
    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    /// Initialize the model.
    pub fn init<B: Backend>(
        &self,
        n_vars: usize,
        n_classes: usize,
        device: &B::Device,
    ) -> Result<RnnClassifier<B>> {
        if n_vars == 0 || n_classes == 0 || self.hidden_size == 0 {
            return Err(CoreError::NetworkBuild(format!(
                "RnnClassifier needs positive n_vars, n_classes and hidden_size, got {}, {}, {}",
                n_vars, n_classes, self.hidden_size
            )));
        }
        Ok(RnnClassifier::new(self, n_vars, n_classes, device))
    }
}

/// RNN classifier for padded time series.
///
/// Padded positions are zeroed before the LSTM; the last time step's hidden
/// state is classified.
#[derive(Module, Debug)]
pub struct RnnClassifier<B: Backend> {
    /// LSTM layer.
    lstm: Lstm<B>,
    /// Dropout layer.
    dropout: Dropout,
    /// Final classifier.
    fc: Linear<B>,
}

impl<B: Backend> RnnClassifier<B> {
    /// Create a new model.
    pub fn new(
        config: &RnnClassifierConfig,
        n_vars: usize,
        n_classes: usize,
        device: &B::Device,
    ) -> Self {
        let lstm = LstmConfig::new(n_vars, config.hidden_size, true).init(device);
        let dropout = DropoutConfig::new(config.dropout).init();
        let fc = LinearConfig::new(config.hidden_size, n_classes).init(device);

        Self { lstm, dropout, fc }
    }
}

impl<B: Backend> ClassificationNetwork<B> for RnnClassifier<B> {
    fn forward(&self, x: Tensor<B, 3>, padding_mask: Tensor<B, 2, Bool>) -> Tensor<B, 2> {
        let [batch, seq_len, _] = x.dims();
        let x = x * padding_mask.float().unsqueeze_dim::<3>(2);

        let (output, _) = self.lstm.forward(x, None);
        let [_, _, hidden_dim] = output.dims();

        // Take last timestep output
        let last_output = output
            .slice([0..batch, (seq_len - 1)..seq_len, 0..hidden_dim])
            .reshape([batch, hidden_dim]);

        self.fc.forward(self.dropout.forward(last_output))
    }
}

impl<B: AutodiffBackend> ClassificationArchitecture<B> for RnnClassifierConfig {
    type Network = RnnClassifier<B>;

    fn name(&self) -> &str {
        "RnnClassifier"
    }

    fn build_network(
        &self,
        n_vars: usize,
        _seq_len: usize,
        n_classes: usize,
        device: &B::Device,
    ) -> Result<RnnClassifier<B>> {
        self.init(n_vars, n_classes, device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_logits_shape() {
        let device = Default::default();
        let model = RnnClassifierConfig::default()
            .with_hidden_size(16)
            .init::<TestBackend>(3, 4, &device)
            .unwrap();
        let x = Tensor::<TestBackend, 3>::ones([2, 10, 3], &device);
        let mask = Tensor::<TestBackend, 2>::ones([2, 10], &device).equal_elem(1.0);

        assert_eq!(model.forward(x.clone(), mask.clone()).dims(), [2, 4]);

        let probs = model.forward_probs(x, mask);
        let sums = probs.sum_dim(1).into_data().to_vec::<f32>().unwrap();
        for s in sums {
            assert!((s - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_rejects_zero_classes() {
        let device = Default::default();
        assert!(RnnClassifierConfig::default()
            .init::<TestBackend>(3, 0, &device)
            .is_err());
    }
}
