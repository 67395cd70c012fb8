//! Zero-shot forecasting with a pretrained decoder.
//!
//! [`ZeroShotForecaster`] wraps a [`PretrainedDecoder`] as an estimator.
//! Nothing is trained: `fit` records the data and resolves the decode length,
//! `predict` feeds left-padded context windows to the decoder chunk by chunk.

use burn::prelude::*;
use ndarray::{s, Array3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrainError};
use tsforge_core::{ComputeBackend, ForecastingHorizon, PretrainedDecoder, TimePoint};
use tsforge_data::{reconstruct_forecast, DataError, PanelFrame, PanelMeta};

/// Configuration for [`ZeroShotForecaster`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZeroShotConfig {
    /// Context values passed to the decoder; longer series are truncated,
    /// shorter ones left-padded.
    pub context_len: usize,
    /// Minimum number of steps to decode.
    pub horizon_len: usize,
    /// Frequency category: 0 high (daily and finer), 1 medium (weekly,
    /// monthly), 2 low (quarterly, yearly). `None` derives it from the
    /// data's frequency, falling back to 0.
    pub freq: Option<i64>,
    /// Backend the decoder runs on.
    pub backend: ComputeBackend,
    /// Series decoded per call.
    pub per_core_batch_size: usize,
}

impl Default for ZeroShotConfig {
    fn default() -> Self {
        Self {
            context_len: 32,
            horizon_len: 16,
            freq: None,
            backend: ComputeBackend::Cpu,
            per_core_batch_size: 32,
        }
    }
}

impl ZeroShotConfig {
    /// Create a config with the given context and horizon lengths.
    pub fn new(context_len: usize, horizon_len: usize) -> Self {
        Self {
            context_len,
            horizon_len,
            ..Default::default()
        }
    }

    /// Set the frequency category.
    #[must_use]
    pub fn with_freq(mut self, freq: i64) -> Self {
        self.freq = Some(freq);
        self
    }

    /// Set the backend.
    #[must_use]
    pub fn with_backend(mut self, backend: ComputeBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Set the decode chunk size.
    #[must_use]
    pub fn with_per_core_batch_size(mut self, size: usize) -> Self {
        self.per_core_batch_size = size;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.context_len == 0 || self.horizon_len == 0 || self.per_core_batch_size == 0 {
            return Err(TrainError::InvalidConfig(format!(
                "context_len, horizon_len and per_core_batch_size must be positive, got {}, {}, {}",
                self.context_len, self.horizon_len, self.per_core_batch_size
            )));
        }
        if let Some(freq) = self.freq {
            if !(0..=2).contains(&freq) {
                return Err(TrainError::InvalidConfig(format!(
                    "frequency category must be 0, 1 or 2, got {}",
                    freq
                )));
            }
        }
        Ok(())
    }
}

struct Fitted {
    horizon_len: usize,
    meta: PanelMeta,
    cutoff: TimePoint,
    /// Last `context_len` observations (or fewer) per instance.
    history: Array3<f32>,
}

/// Estimator around a pretrained, univariate decoder.
pub struct ZeroShotForecaster<B: Backend, D: PretrainedDecoder<B>> {
    decoder: D,
    config: ZeroShotConfig,
    device: B::Device,
    fitted: Option<Fitted>,
}

impl<B: Backend, D: PretrainedDecoder<B>> ZeroShotForecaster<B, D> {
    /// Create an unfitted forecaster.
    ///
    /// # Errors
    ///
    /// Returns a missing-dependency error when the configured backend is not
    /// compiled in, and a configuration error for invalid lengths.
    pub fn new(decoder: D, config: ZeroShotConfig, device: B::Device) -> Result<Self> {
        config.backend.ensure_available()?;
        config.validate()?;
        Ok(Self {
            decoder,
            config,
            device,
            fitted: None,
        })
    }

    /// The estimator configuration.
    pub fn config(&self) -> &ZeroShotConfig {
        &self.config
    }

    /// Whether `fit` has completed.
    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Number of steps decoded per series.
    pub fn horizon_len(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.horizon_len)
    }

    /// Record `y` and resolve `horizon_len = max(configured, max(fh))`.
    ///
    /// # Errors
    ///
    /// Returns a shape error for multivariate or ragged data and an error for
    /// in-sample horizons.
    pub fn fit(&mut self, y: &PanelFrame, fh: Option<&ForecastingHorizon>) -> Result<()> {
        self.fitted = None;
        ensure_univariate(y)?;
        let cutoff = y.cutoff()?;
        let freq = y.require_freq()?;
        let horizon_len = match fh {
            Some(fh) => {
                let relative = fh.to_relative(&cutoff, freq.as_ref())?;
                relative.ensure_out_of_sample()?;
                let requested = relative.max_offset().unwrap_or(0) as usize;
                self.config.horizon_len.max(requested)
            }
            None => self.config.horizon_len,
        };

        let panel = y.to_array3()?;
        let length = panel.dim().1;
        let keep = length.min(self.config.context_len);
        let history = panel.slice(s![.., length - keep.., ..]).to_owned();

        tracing::info!(
            "Zero-shot forecaster ready on {} backend: {} instances, context_len={}, horizon_len={}",
            self.config.backend,
            history.dim().0,
            self.config.context_len,
            horizon_len
        );
        self.fitted = Some(Fitted {
            horizon_len,
            meta: y.meta(),
            cutoff,
            history,
        });
        Ok(())
    }

    /// Decode forecasts from the end of the fitted data, or of `y`.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::NotFitted`] before `fit` and
    /// [`TrainError::HorizonExceedsMaximum`] when `fh` reaches past
    /// `horizon_len`.
    pub fn predict(
        &self,
        fh: Option<&ForecastingHorizon>,
        y: Option<&PanelFrame>,
    ) -> Result<PanelFrame> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or(TrainError::NotFitted("ZeroShotForecaster"))?;
        let (panel, meta, cutoff) = match y {
            Some(y) => {
                ensure_univariate(y)?;
                (y.to_array3()?, y.meta(), y.cutoff()?)
            }
            None => (fitted.history.clone(), fitted.meta.clone(), fitted.cutoff),
        };

        let fh = match fh {
            Some(fh) => fh.to_relative(&cutoff, meta.freq.as_ref())?,
            None => ForecastingHorizon::range(fitted.horizon_len)?,
        };
        fh.ensure_out_of_sample()?;
        let requested = fh.max_offset().unwrap_or(0);
        if requested > fitted.horizon_len as i64 {
            return Err(TrainError::HorizonExceedsMaximum {
                requested,
                max: fitted.horizon_len,
            });
        }

        let freq = self
            .config
            .freq
            .or_else(|| meta.freq.map(|f| f.unit().category()))
            .unwrap_or(0);
        let forecasts = self.decode_panel(&panel, fitted.horizon_len, freq)?;
        Ok(reconstruct_forecast(&meta, forecasts.view(), &cutoff, &fh)?)
    }

    /// Left-pad, chunk and decode `(instance, time, 1)` data.
    fn decode_panel(
        &self,
        panel: &Array3<f32>,
        horizon_len: usize,
        freq: i64,
    ) -> Result<Array3<f32>> {
        let context_len = self.config.context_len;
        let (n_instances, length, _) = panel.dim();
        let keep = length.min(context_len);
        let pad_len = context_len - keep;

        let mut forecasts = Vec::with_capacity(n_instances * horizon_len);
        let mut start = 0;
        while start < n_instances {
            let end = (start + self.config.per_core_batch_size).min(n_instances);
            let batch = end - start;

            let mut history = Vec::with_capacity(batch * context_len);
            let mut padding = Vec::with_capacity(batch * (context_len + horizon_len));
            for i in start..end {
                history.extend(std::iter::repeat(0.0f32).take(pad_len));
                history.extend(panel.slice(s![i, length - keep.., 0]).iter().copied());
                padding.extend(std::iter::repeat(1.0f32).take(pad_len));
                padding.extend(std::iter::repeat(0.0f32).take(keep + horizon_len));
            }
            let history = Tensor::<B, 1>::from_floats(history.as_slice(), &self.device)
                .reshape([batch, context_len]);
            let padding = Tensor::<B, 1>::from_floats(padding.as_slice(), &self.device)
                .reshape([batch, context_len + horizon_len]);
            let frequency = Tensor::<B, 1, Int>::from_ints(vec![freq; batch].as_slice(), &self.device)
                .reshape([batch, 1]);

            let (point, _quantiles) =
                self.decoder
                    .decode(history, padding, frequency, horizon_len)?;
            if point.dims() != [batch, horizon_len] {
                return Err(TrainError::Tensor(format!(
                    "decoder returned {:?}, expected {:?}",
                    point.dims(),
                    [batch, horizon_len]
                )));
            }
            forecasts.extend(
                point
                    .into_data()
                    .convert::<f32>()
                    .to_vec::<f32>()
                    .map_err(|e| TrainError::Tensor(format!("{:?}", e)))?,
            );
            tracing::debug!("Decoded series {}..{}", start, end);
            start = end;
        }

        Array3::from_shape_vec((n_instances, horizon_len, 1), forecasts)
            .map_err(|e| TrainError::Tensor(e.to_string()))
    }
}

fn ensure_univariate(y: &PanelFrame) -> Result<()> {
    if y.columns().len() != 1 {
        return Err(DataError::InvalidShape(format!(
            "zero-shot forecasting supports a single target column, got {:?}",
            y.columns()
        ))
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use ndarray::Array2;
    use tsforge_models::NaiveDecoder;

    type TestBackend = NdArray;

    fn forecaster(config: ZeroShotConfig) -> ZeroShotForecaster<TestBackend, NaiveDecoder> {
        ZeroShotForecaster::new(NaiveDecoder::default(), config, Default::default()).unwrap()
    }

    fn short_series() -> PanelFrame {
        PanelFrame::from_series(
            (0..5).map(TimePoint::Int).collect(),
            vec!["y".to_string()],
            Array2::from_shape_fn((5, 1), |(t, _)| t as f32),
        )
        .unwrap()
    }

    #[test]
    fn test_horizon_len_grows_with_fh() {
        let mut zs = forecaster(ZeroShotConfig::new(8, 2));
        zs.fit(&short_series(), Some(&ForecastingHorizon::range(4).unwrap()))
            .unwrap();
        assert_eq!(zs.horizon_len(), Some(4));

        zs.fit(&short_series(), Some(&ForecastingHorizon::range(1).unwrap()))
            .unwrap();
        assert_eq!(zs.horizon_len(), Some(2));
    }

    #[test]
    fn test_short_series_left_padded() {
        let mut zs = forecaster(ZeroShotConfig::new(8, 3).with_per_core_batch_size(1));
        zs.fit(&short_series(), None).unwrap();
        let forecast = zs.predict(None, None).unwrap();
        assert_eq!(
            forecast.index().times(),
            &[TimePoint::Int(5), TimePoint::Int(6), TimePoint::Int(7)]
        );
        assert!(forecast.values().iter().all(|v| *v == 4.0));
    }

    #[test]
    fn test_horizon_beyond_decode_length() {
        let mut zs = forecaster(ZeroShotConfig::new(4, 2));
        zs.fit(&short_series(), None).unwrap();
        let fh = ForecastingHorizon::relative([3]).unwrap();
        assert!(matches!(
            zs.predict(Some(&fh), None),
            Err(TrainError::HorizonExceedsMaximum { requested: 3, max: 2 })
        ));
    }

    #[test]
    fn test_invalid_config() {
        assert!(ZeroShotForecaster::<TestBackend, _>::new(
            NaiveDecoder::default(),
            ZeroShotConfig::new(0, 2),
            Default::default()
        )
        .is_err());
        assert!(ZeroShotForecaster::<TestBackend, _>::new(
            NaiveDecoder::default(),
            ZeroShotConfig::new(4, 2).with_freq(5),
            Default::default()
        )
        .is_err());
    }

    #[test]
    fn test_multivariate_rejected() {
        let y = PanelFrame::from_series(
            (0..5).map(TimePoint::Int).collect(),
            vec!["a".to_string(), "b".to_string()],
            Array2::zeros((5, 2)),
        )
        .unwrap();
        let mut zs = forecaster(ZeroShotConfig::default());
        assert!(zs.fit(&y, None).is_err());
    }
}
