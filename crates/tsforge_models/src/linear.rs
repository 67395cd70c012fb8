//! LTSF-Linear: a single linear layer from history to forecast.

use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};

use tsforge_core::{CoreError, ForecastingArchitecture, ForecastingNetwork, Result};

/// Configuration for [`LTSFLinear`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LTSFLinearConfig {
    /// History length.
    pub seq_len: usize,
    /// Use one linear map per variable instead of a shared one.
    pub individual: bool,
    /// Exogenous columns appended to the history, in order.
    pub exogenous: Vec<String>,
}

impl Default for LTSFLinearConfig {
    fn default() -> Self {
        Self {
            seq_len: 24,
            individual: false,
            exogenous: Vec::new(),
        }
    }
}

impl LTSFLinearConfig {
    /// Create a new config.
    pub fn new(seq_len: usize) -> Self {
        Self {
            seq_len,
            ..Default::default()
        }
    }

    /// Use one linear map per variable.
    #[must_use]
    pub fn with_individual(mut self, individual: bool) -> Self {
        self.individual = individual;
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
    ) -> Result<LTSFLinear<B>> {
        if self.seq_len == 0 || pred_len == 0 || n_vars == 0 {
            return Err(CoreError::NetworkBuild(format!(
                "LTSFLinear needs positive seq_len, pred_len and n_vars, got {}, {}, {}",
                self.seq_len, pred_len, n_vars
            )));
        }
        Ok(LTSFLinear::new(self, pred_len, n_vars, n_exog, device))
    }
}

/// Linear forecaster mapping `seq_len` history steps to `pred_len` steps.
///
/// Each variable's history is projected independently along the time axis.
/// Exogenous columns feed a separate projection added to every variable's
/// forecast.
#[derive(Module, Debug)]
pub struct LTSFLinear<B: Backend> {
    /// One layer when shared, one per variable otherwise.
    linears: Vec<Linear<B>>,
    /// Projection of the flattened exogenous window.
    exog_head: Option<Linear<B>>,
    seq_len: usize,
    pred_len: usize,
    n_vars: usize,
}

impl<B: Backend> LTSFLinear<B> {
    /// Create a new model.
    pub fn new(
        config: &LTSFLinearConfig,
        pred_len: usize,
        n_vars: usize,
        n_exog: usize,
        device: &B::Device,
    ) -> Self {
        let n_linears = if config.individual { n_vars } else { 1 };
        let linears = (0..n_linears)
            .map(|_| LinearConfig::new(config.seq_len, pred_len).init(device))
            .collect();
        let exog_head = (n_exog > 0)
            .then(|| LinearConfig::new(config.seq_len * n_exog, pred_len * n_vars).init(device));

        Self {
            linears,
            exog_head,
            seq_len: config.seq_len,
            pred_len,
            n_vars,
        }
    }
}

impl<B: Backend> ForecastingNetwork<B> for LTSFLinear<B> {
    fn seq_len(&self) -> usize {
        self.seq_len
    }

    fn pred_len(&self) -> usize {
        self.pred_len
    }

    fn forward(&self, inputs: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, seq_len, features] = inputs.dims();
        let target = inputs
            .clone()
            .slice([0..batch, 0..seq_len, 0..self.n_vars])
            .swap_dims(1, 2);

        // (batch, vars, seq_len) -> (batch, vars, pred_len)
        let out = if self.linears.len() == 1 {
            self.linears[0].forward(target)
        } else {
            let per_var = self
                .linears
                .iter()
                .enumerate()
                .map(|(v, linear)| {
                    linear.forward(target.clone().slice([0..batch, v..v + 1, 0..seq_len]))
                })
                .collect();
            Tensor::cat(per_var, 1)
        };
        let mut out = out.swap_dims(1, 2);

        if let Some(head) = &self.exog_head {
            let exog = inputs
                .slice([0..batch, 0..seq_len, self.n_vars..features])
                .reshape([batch, seq_len * (features - self.n_vars)]);
            let exog_out = head.forward(exog).reshape([batch, self.pred_len, self.n_vars]);
            out = out + exog_out;
        }
        out
    }
}

impl<B: AutodiffBackend> ForecastingArchitecture<B> for LTSFLinearConfig {
    type Network = LTSFLinear<B>;

    fn name(&self) -> &str {
        "LTSFLinear"
    }

    fn build_network(
        &self,
        pred_len: usize,
        n_vars: usize,
        n_exog: usize,
        device: &B::Device,
    ) -> Result<LTSFLinear<B>> {
        self.init(pred_len, n_vars, n_exog, device)
    }

    fn exogenous_columns(&self) -> Vec<String> {
        self.exogenous.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_shared_output_shape() {
        let device = Default::default();
        let model = LTSFLinearConfig::new(12)
            .init::<TestBackend>(3, 2, 0, &device)
            .unwrap();
        let x = Tensor::<TestBackend, 3>::zeros([4, 12, 2], &device);
        assert_eq!(model.forward(x).dims(), [4, 3, 2]);
        assert_eq!(model.seq_len(), 12);
        assert_eq!(model.pred_len(), 3);
        assert_eq!(model.label_len(), 0);
    }

    #[test]
    fn test_individual_with_exogenous() {
        let device = Default::default();
        let model = LTSFLinearConfig::new(8)
            .with_individual(true)
            .init::<TestBackend>(4, 3, 2, &device)
            .unwrap();
        let x = Tensor::<TestBackend, 3>::ones([2, 8, 5], &device);
        assert_eq!(model.forward(x).dims(), [2, 4, 3]);
    }

    #[test]
    fn test_rejects_zero_sizes() {
        let device = Default::default();
        assert!(LTSFLinearConfig::new(0)
            .init::<TestBackend>(3, 1, 0, &device)
            .is_err());
        assert!(LTSFLinearConfig::new(4)
            .init::<TestBackend>(0, 1, 0, &device)
            .is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = LTSFLinearConfig::new(16)
            .with_individual(true)
            .with_exogenous(vec!["price".to_string()]);
        let json = serde_json::to_string(&config).unwrap();
        let restored: LTSFLinearConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }
}
