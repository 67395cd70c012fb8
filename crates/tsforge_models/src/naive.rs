//! Last-value decoder.

use burn::prelude::*;

use tsforge_core::{CoreError, PretrainedDecoder, Result};

/// A [`PretrainedDecoder`] that repeats the last context value.
///
/// Context windows are left-padded, so the last column is always the most
/// recent observation. Every quantile equals the point forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NaiveDecoder {
    n_quantiles: usize,
}

impl Default for NaiveDecoder {
    fn default() -> Self {
        Self { n_quantiles: 9 }
    }
}

impl NaiveDecoder {
    /// Create a decoder emitting `n_quantiles` quantile tracks.
    #[must_use]
    pub const fn new(n_quantiles: usize) -> Self {
        Self { n_quantiles }
    }
}

impl<B: Backend> PretrainedDecoder<B> for NaiveDecoder {
    fn decode(
        &self,
        history: Tensor<B, 2>,
        padding: Tensor<B, 2>,
        frequency: Tensor<B, 2, Int>,
        horizon_len: usize,
    ) -> Result<(Tensor<B, 2>, Tensor<B, 3>)> {
        let [batch, context_len] = history.dims();
        if context_len == 0 || horizon_len == 0 {
            return Err(CoreError::ShapeMismatch(format!(
                "cannot decode {} steps from a context of {}",
                horizon_len, context_len
            )));
        }
        if padding.dims() != [batch, context_len + horizon_len] {
            return Err(CoreError::ShapeMismatch(format!(
                "padding shape {:?}, expected {:?}",
                padding.dims(),
                [batch, context_len + horizon_len]
            )));
        }
        if frequency.dims() != [batch, 1] {
            return Err(CoreError::ShapeMismatch(format!(
                "frequency shape {:?}, expected {:?}",
                frequency.dims(),
                [batch, 1]
            )));
        }

        let last = history.slice([0..batch, (context_len - 1)..context_len]);
        let point = last.repeat_dim(1, horizon_len);
        let quantiles = point
            .clone()
            .unsqueeze_dim::<3>(2)
            .repeat_dim(2, self.n_quantiles);
        Ok((point, quantiles))
    }
}
