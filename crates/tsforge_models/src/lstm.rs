//! LSTM encoder forecaster.

use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, Lstm, LstmConfig};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use tsforge_core::{CoreError, ForecastingArchitecture, ForecastingNetwork, Result};

/// Configuration for [`LstmForecaster`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmForecasterConfig {
    /// History length.
    pub seq_len: usize,
    /// Hidden dimension.
    pub hidden_size: usize,
    /// Trailing history steps re-emitted before the forecast.
    pub label_len: usize,
    /// Dropout rate.
    pub dropout: f64,
    /// Exogenous columns appended to the history, in order.
    pub exogenous: Vec<String>,
}

impl Default for LstmForecasterConfig {
    fn default() -> Self {
        Self {
            seq_len: 24,
            hidden_size: 32,
            label_len: 0,
            dropout: 0.0,
            exogenous: Vec::new(),
        }
    }
}

impl LstmForecasterConfig {
    /// Create a new config.
    pub fn new(seq_len: usize) -> Self {
        Self {
            seq_len,
            ..Default::default()
        }
    }

    /// Set the hidden dimension.
    #[must_use]
    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    /// Set the warm-start length.
    #[must_use]
    pub fn with_label_len(mut self, label_len: usize) -> Self {
        self.label_len = label_len;
        self
    }

    /// Set dropout rate.
    #[must_use]
    pub fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    /// Declare exogenous columns.
    #[must_use]
    pub fn with_exogenous(mut self, columns: Vec<String>) -> Self {
        self.exogenous = columns;
        self
    }

    /// Initialize the model.
    pub fn init<B: Backend>(
        &self,
        pred_len: usize,
        n_vars: usize,
        n_exog: usize,
        device: &B::Device,
    ) -> Result<LstmForecaster<B>> {
        if self.seq_len == 0 || pred_len == 0 || n_vars == 0 || self.hidden_size == 0 {
            return Err(CoreError::NetworkBuild(format!(
                "LstmForecaster needs positive seq_len, pred_len, n_vars and hidden_size, \
                 got {}, {}, {}, {}",
                self.seq_len, pred_len, n_vars, self.hidden_size
            )));
        }
        if self.label_len > self.seq_len {
            return Err(CoreError::NetworkBuild(format!(
                "label_len {} exceeds seq_len {}",
                self.label_len, self.seq_len
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(CoreError::NetworkBuild(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        Ok(LstmForecaster::new(self, pred_len, n_vars, n_exog, device))
    }
}

/// LSTM over the history window with a linear head on the last hidden state.
///
/// Outputs `label_len + pred_len` steps; the leading `label_len` steps
/// reconstruct the end of the history.
#[derive(Module, Debug)]
pub struct LstmForecaster<B: Backend> {
    lstm: Lstm<B>,
    dropout: Dropout,
    head: Linear<B>,
    seq_len: usize,
    pred_len: usize,
    label_len: usize,
    n_vars: usize,
}

impl<B: Backend> LstmForecaster<B> {
    /// Create a new model.
    pub fn new(
        config: &LstmForecasterConfig,
        pred_len: usize,
        n_vars: usize,
        n_exog: usize,
        device: &B::Device,
    ) -> Self {
        let lstm = LstmConfig::new(n_vars + n_exog, config.hidden_size, true).init(device);
        let dropout = DropoutConfig::new(config.dropout).init();
        let head = LinearConfig::new(config.hidden_size, (config.label_len + pred_len) * n_vars)
            .init(device);

        Self {
            lstm,
            dropout,
            head,
            seq_len: config.seq_len,
            pred_len,
            label_len: config.label_len,
            n_vars,
        }
    }
}

impl<B: Backend> ForecastingNetwork<B> for LstmForecaster<B> {
    fn seq_len(&self) -> usize {
        self.seq_len
    }

    fn pred_len(&self) -> usize {
        self.pred_len
    }

    fn label_len(&self) -> usize {
        self.label_len
    }

    fn forward(&self, inputs: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, seq_len, _] = inputs.dims();
        let (output, _) = self.lstm.forward(inputs, None);
        let [_, _, hidden_dim] = output.dims();

        // Take last timestep output
        let last = output
            .slice([0..batch, (seq_len - 1)..seq_len, 0..hidden_dim])
            .reshape([batch, hidden_dim]);

        let out = self.head.forward(self.dropout.forward(last));
        out.reshape([batch, self.label_len + self.pred_len, self.n_vars])
    }
}

impl<B: AutodiffBackend> ForecastingArchitecture<B> for LstmForecasterConfig {
    type Network = LstmForecaster<B>;

    fn name(&self) -> &str {
        "LstmForecaster"
    }

    fn build_network(
        &self,
        pred_len: usize,
        n_vars: usize,
        n_exog: usize,
        device: &B::Device,
    ) -> Result<LstmForecaster<B>> {
        self.init(pred_len, n_vars, n_exog, device)
    }

    fn exogenous_columns(&self) -> Vec<String> {
        self.exogenous.clone()
    }
}
