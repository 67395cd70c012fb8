//! Network and architecture traits.
//!
//! Networks are burn modules with a fixed forward contract. Architectures are
//! the configurations estimators build networks from once the data shape and
//! horizon are known.

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Bool;

use crate::error::Result;

/// A network mapping a history window to a forecast window.
pub trait ForecastingNetwork<B: Backend>: Module<B> {
    /// Length of the history window the network consumes.
    fn seq_len(&self) -> usize;

    /// Number of future steps the network predicts.
    fn pred_len(&self) -> usize;

    /// Number of trailing history steps the network re-emits before the
    /// forecast (warm-start decoders). Zero for plain forecasters.
    fn label_len(&self) -> usize {
        0
    }

    /// Forward pass.
    ///
    /// # Arguments
    ///
    /// * `inputs` - Tensor of shape `(batch, seq_len, features)`
    ///
    /// # Returns
    ///
    /// Tensor of shape `(batch, label_len + pred_len, vars)`
    fn forward(&self, inputs: Tensor<B, 3>) -> Tensor<B, 3>;
}

/// A network mapping padded instances to class logits.
pub trait ClassificationNetwork<B: Backend>: Module<B> {
    /// Forward pass returning logits.
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor of shape `(batch, time, vars)`
    /// * `padding_mask` - `(batch, time)`, `true` at valid positions
    ///
    /// # Returns
    ///
    /// Logits tensor of shape `(batch, n_classes)`
    fn forward(&self, x: Tensor<B, 3>, padding_mask: Tensor<B, 2, Bool>) -> Tensor<B, 2>;

    /// Forward pass returning probabilities.
    fn forward_probs(&self, x: Tensor<B, 3>, padding_mask: Tensor<B, 2, Bool>) -> Tensor<B, 2> {
        burn::tensor::activation::softmax(self.forward(x, padding_mask), 1)
    }
}

/// Builds forecasting networks sized to the data seen at fit time.
///
/// The gradient-free inner module of the network must itself be a
/// [`ForecastingNetwork`] so fitted estimators can predict without autodiff
/// bookkeeping.
pub trait ForecastingArchitecture<B: AutodiffBackend> {
    /// The trainable network type.
    type Network: ForecastingNetwork<B> + AutodiffModule<B>;

    /// Human-readable architecture name, used in logs.
    fn name(&self) -> &str;

    /// Build a freshly initialized network.
    ///
    /// # Arguments
    ///
    /// * `pred_len` - Forecast length resolved from the horizon
    /// * `n_vars` - Number of target variables
    /// * `n_exog` - Number of exogenous columns appended to the input
    /// * `device` - Device to allocate parameters on
    fn build_network(
        &self,
        pred_len: usize,
        n_vars: usize,
        n_exog: usize,
        device: &B::Device,
    ) -> Result<Self::Network>;

    /// Criterion used when none is configured.
    fn default_criterion(&self) -> &'static str {
        "MSELoss"
    }

    /// Exogenous columns the network expects, in input order.
    fn exogenous_columns(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Builds classification networks sized to the data seen at fit time.
pub trait ClassificationArchitecture<B: AutodiffBackend> {
    /// The trainable network type.
    type Network: ClassificationNetwork<B> + AutodiffModule<B>;

    /// Human-readable architecture name, used in logs.
    fn name(&self) -> &str;

    /// Build a freshly initialized network.
    fn build_network(
        &self,
        n_vars: usize,
        seq_len: usize,
        n_classes: usize,
        device: &B::Device,
    ) -> Result<Self::Network>;

    /// Criterion used when none is configured.
    fn default_criterion(&self) -> &'static str {
        "CrossEntropyLoss"
    }
}

/// A pretrained forecasting model used as a black box.
///
/// Implementations receive left-padded context windows and return point
/// forecasts together with quantile forecasts.
pub trait PretrainedDecoder<B: Backend> {
    /// Decode `horizon_len` steps for each row of `history`.
    ///
    /// # Arguments
    ///
    /// * `history` - `(batch, context_len)` context values
    /// * `padding` - `(batch, context_len + horizon_len)`, `1.0` where padded
    /// * `frequency` - `(batch, 1)` frequency categories
    /// * `horizon_len` - number of steps to decode
    ///
    /// # Returns
    ///
    /// Point forecasts `(batch, horizon_len)` and quantiles
    /// `(batch, horizon_len, n_quantiles)`.
    fn decode(
        &self,
        history: Tensor<B, 2>,
        padding: Tensor<B, 2>,
        frequency: Tensor<B, 2, Int>,
        horizon_len: usize,
    ) -> Result<(Tensor<B, 2>, Tensor<B, 3>)>;
}
