//! Neural forecaster front-end.
//!
//! [`NeuralForecaster`] adapts any [`ForecastingArchitecture`] to a
//! fit/predict estimator over [`PanelFrame`]s:
//!
//! - `fit` resolves the horizon, builds a network sized to it, windows the
//!   panel and trains for a fixed number of epochs.
//! - `predict` runs the gradient-free network on the last `seq_len`
//!   observations of every instance and rebuilds a frame indexed by absolute
//!   time, filtered to the requested horizon.

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use ndarray::{s, Array3};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, TrainError};
use crate::registry::{instantiate_optimizer, instantiate_regression_criterion};
use crate::training::Trainer;
use tsforge_core::{
    ForecastingArchitecture, ForecastingHorizon, ForecastingNetwork, Frequency, Seed, Split,
    TimePoint,
};
use tsforge_data::{
    assemble_inference_exogenous, reconstruct_forecast, DataError, PanelFrame, PanelMeta,
    WindowDataset, WindowLoader, WindowedDataset,
};

/// Configuration for [`NeuralForecaster`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecasterConfig {
    /// Number of training epochs.
    pub num_epochs: usize,
    /// Windows per batch.
    pub batch_size: usize,
    /// Learning rate.
    pub lr: f64,
    /// Optimizer registry name; `None` selects Adam.
    pub optimizer: Option<String>,
    /// Optimizer keyword arguments.
    pub optimizer_kwargs: Map<String, Value>,
    /// Criterion registry name; `None` selects the architecture default.
    pub criterion: Option<String>,
    /// Criterion keyword arguments.
    pub criterion_kwargs: Map<String, Value>,
    /// Forecast length used when `fit` receives no horizon.
    pub default_horizon: Option<usize>,
    /// Shuffle training windows every epoch.
    pub shuffle: bool,
    /// Seed for network initialization and shuffling.
    pub seed: Seed,
    /// Log per-epoch losses at info level.
    pub verbose: bool,
}

impl Default for ForecasterConfig {
    fn default() -> Self {
        Self {
            num_epochs: 16,
            batch_size: 8,
            lr: 1e-3,
            optimizer: None,
            optimizer_kwargs: Map::new(),
            criterion: None,
            criterion_kwargs: Map::new(),
            default_horizon: None,
            shuffle: true,
            seed: Seed::default(),
            verbose: false,
        }
    }
}

impl ForecasterConfig {
    /// Set the number of epochs.
    #[must_use]
    pub fn with_num_epochs(mut self, num_epochs: usize) -> Self {
        self.num_epochs = num_epochs;
        self
    }

    /// Set the batch size.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the learning rate.
    #[must_use]
    pub fn with_lr(mut self, lr: f64) -> Self {
        self.lr = lr;
        self
    }

    /// Select an optimizer by registry name.
    #[must_use]
    pub fn with_optimizer(mut self, name: impl Into<String>, kwargs: Map<String, Value>) -> Self {
        self.optimizer = Some(name.into());
        self.optimizer_kwargs = kwargs;
        self
    }

    /// Select a criterion by registry name.
    #[must_use]
    pub fn with_criterion(mut self, name: impl Into<String>, kwargs: Map<String, Value>) -> Self {
        self.criterion = Some(name.into());
        self.criterion_kwargs = kwargs;
        self
    }

    /// Set the horizon used when `fit` receives none.
    #[must_use]
    pub fn with_default_horizon(mut self, steps: usize) -> Self {
        self.default_horizon = Some(steps);
        self
    }

    /// Enable or disable shuffling.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Set the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: Seed) -> Self {
        self.seed = seed;
        self
    }

    /// Log per-epoch losses at info level.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(TrainError::InvalidConfig(
                "batch_size must be positive".to_string(),
            ));
        }
        if self.default_horizon == Some(0) {
            return Err(TrainError::InvalidConfig(
                "default_horizon must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// State kept after a successful fit.
#[derive(Debug)]
struct Fitted<N> {
    network: N,
    meta: PanelMeta,
    cutoff: TimePoint,
    pred_len: usize,
    seq_len: usize,
    label_len: usize,
    /// Last `seq_len` observations of every training instance.
    history: Array3<f32>,
    /// Exogenous values over the fitted period.
    exog_in_sample: Option<Array3<f32>>,
    epoch_losses: Vec<f32>,
}

/// Fit/predict estimator over a forecasting architecture.
///
/// # Example
///
/// ```rust,ignore
/// use tsforge_train::{ForecasterConfig, NeuralForecaster};
/// use tsforge_models::LTSFLinearConfig;
///
/// let mut forecaster = NeuralForecaster::<TrainBackend, _>::new(
///     LTSFLinearConfig::new(12),
///     ForecasterConfig::default().with_num_epochs(50),
///     device,
/// );
/// forecaster.fit(&y, None, Some(&ForecastingHorizon::range(3)?))?;
/// let forecast = forecaster.predict(None, None, None)?;
/// ```
pub struct NeuralForecaster<B, A>
where
    B: AutodiffBackend,
    A: ForecastingArchitecture<B>,
{
    architecture: A,
    config: ForecasterConfig,
    device: B::Device,
    fitted: Option<Fitted<<A::Network as AutodiffModule<B>>::InnerModule>>,
}

impl<B, A> NeuralForecaster<B, A>
where
    B: AutodiffBackend,
    A: ForecastingArchitecture<B>,
    A::Network: 'static,
    <A::Network as AutodiffModule<B>>::InnerModule: ForecastingNetwork<B::InnerBackend>,
{
    /// Create an unfitted forecaster.
    pub fn new(architecture: A, config: ForecasterConfig, device: B::Device) -> Self {
        Self {
            architecture,
            config,
            device,
            fitted: None,
        }
    }

    /// The architecture networks are built from.
    pub fn architecture(&self) -> &A {
        &self.architecture
    }

    /// The estimator configuration.
    pub fn config(&self) -> &ForecasterConfig {
        &self.config
    }

    /// Whether `fit` has completed.
    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Last time value of the training data.
    pub fn cutoff(&self) -> Option<&TimePoint> {
        self.fitted.as_ref().map(|f| &f.cutoff)
    }

    /// Forecast length the network was built for.
    pub fn pred_len(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.pred_len)
    }

    /// Per-epoch training losses of the last fit.
    pub fn epoch_losses(&self) -> Option<&[f32]> {
        self.fitted.as_ref().map(|f| f.epoch_losses.as_slice())
    }

    /// The trained, gradient-free network.
    pub fn network(&self) -> Option<&<A::Network as AutodiffModule<B>>::InnerModule> {
        self.fitted.as_ref().map(|f| &f.network)
    }

    fn resolve_pred_len(
        &self,
        fh: Option<&ForecastingHorizon>,
        cutoff: &TimePoint,
        freq: Option<&Frequency>,
    ) -> Result<usize> {
        match fh {
            Some(fh) => {
                let relative = fh.to_relative(cutoff, freq)?;
                relative.ensure_out_of_sample()?;
                let max = relative.max_offset().ok_or(TrainError::MissingHorizon)?;
                Ok(max as usize)
            }
            None => self.config.default_horizon.ok_or(TrainError::MissingHorizon),
        }
    }

    /// Train a fresh network on `y`.
    ///
    /// `x` must carry the architecture's exogenous columns over the same
    /// index as `y`. A second call discards the previous network, optimizer
    /// and criterion. On error the forecaster is left unfitted.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown optimizer or criterion names
    /// before any data is touched, [`TrainError::MissingHorizon`] without a
    /// horizon, [`TrainError::EmptyTrainingSet`] when no window fits, and
    /// shape errors for ragged or mismatched inputs.
    pub fn fit(
        &mut self,
        y: &PanelFrame,
        x: Option<&PanelFrame>,
        fh: Option<&ForecastingHorizon>,
    ) -> Result<()> {
        self.fitted = None;
        self.config.validate()?;

        let criterion = instantiate_regression_criterion::<B>(
            self.config.criterion.as_deref(),
            self.architecture.default_criterion(),
            &self.config.criterion_kwargs,
        )?;
        let mut optim = instantiate_optimizer::<A::Network, B>(
            self.config.optimizer.as_deref(),
            &self.config.optimizer_kwargs,
            self.config.lr,
        )?;

        let cutoff = y.cutoff()?;
        let freq = y.require_freq()?;
        let pred_len = self.resolve_pred_len(fh, &cutoff, freq.as_ref())?;
        let panel = y.to_array3()?;
        let (n_instances, series_length, n_vars) = panel.dim();

        let exog_columns = self.architecture.exogenous_columns();
        let exog = if exog_columns.is_empty() {
            None
        } else {
            let x = x.ok_or_else(|| TrainError::MissingExogenous(exog_columns.clone()))?;
            let (in_sample, _) = x.select_columns(&exog_columns)?.split_at(&cutoff);
            if in_sample.instance_keys() != y.instance_keys()
                || in_sample.shared_times()? != y.shared_times()?
            {
                return Err(DataError::IndexMismatch(
                    "exogenous data must share the index of the target series".to_string(),
                )
                .into());
            }
            Some(in_sample.to_array3()?)
        };
        let n_exog = exog.as_ref().map_or(0, |e| e.dim().2);

        B::seed(self.config.seed.derive("init").value());
        let network = self
            .architecture
            .build_network(pred_len, n_vars, n_exog, &self.device)?;
        let seq_len = network.seq_len();
        let label_len = network.label_len();
        if network.pred_len() != pred_len {
            return Err(TrainError::InvalidConfig(format!(
                "{} built a network for {} steps, {} were requested",
                self.architecture.name(),
                network.pred_len(),
                pred_len
            )));
        }

        let mut dataset = WindowedDataset::new(panel.view(), seq_len, pred_len)?
            .with_label_len(label_len)?;
        if let Some(exog) = &exog {
            dataset = dataset.with_exogenous(exog.view())?;
        }
        if dataset.is_empty() {
            return Err(TrainError::EmptyTrainingSet {
                series_length,
                seq_len,
                pred_len,
            });
        }
        let n_windows = dataset.len();

        let mut loader = WindowLoader::builder(dataset)
            .batch_size(self.config.batch_size)
            .shuffle(self.config.shuffle)
            .seed(self.config.seed.derive("shuffle"))
            .split(Split::Train)
            .build()?;

        tracing::info!(
            "Fitting {} on {} windows from {} instances (seq_len={}, pred_len={}, label_len={})",
            self.architecture.name(),
            n_windows,
            n_instances,
            seq_len,
            pred_len,
            label_len
        );

        let trainer = Trainer::<B>::new(
            self.device.clone(),
            self.config.num_epochs,
            self.config.verbose,
        );
        let output = trainer.fit_with_loss(network, &mut optim, &mut loader, |network, batch| {
            let target = batch.target.ok_or_else(|| {
                TrainError::InvalidConfig("training batch without a target".to_string())
            })?;
            let output = network.forward(batch.inputs);
            if output.dims() != target.dims() {
                return Err(TrainError::Tensor(format!(
                    "network output {:?} does not match target {:?}",
                    output.dims(),
                    target.dims()
                )));
            }
            Ok(criterion.forward(output, target))
        })?;

        tracing::info!(
            "Fitted {} in {:.2}s, final loss {:?}",
            self.architecture.name(),
            output.training_time_secs,
            output.epoch_losses.last()
        );

        let history = panel
            .slice(s![.., series_length - seq_len.., ..])
            .to_owned();
        self.fitted = Some(Fitted {
            network: output.model.valid(),
            meta: y.meta(),
            cutoff,
            pred_len,
            seq_len,
            label_len,
            history,
            exog_in_sample: exog,
            epoch_losses: output.epoch_losses,
        });
        Ok(())
    }

    /// Forecast from the end of the training data, or from the end of `y`.
    ///
    /// `fh` defaults to every step the network was built for. Passing `y`
    /// forecasts a different panel with the fitted network (global
    /// forecasting); the result mirrors its index names and columns. `x`
    /// must cover the forecast period when the architecture uses exogenous
    /// columns.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::NotFitted`] before `fit`, an error for in-sample
    /// or too-long horizons, and shape errors for short or ragged inputs.
    pub fn predict(
        &self,
        fh: Option<&ForecastingHorizon>,
        x: Option<&PanelFrame>,
        y: Option<&PanelFrame>,
    ) -> Result<PanelFrame> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or(TrainError::NotFitted("NeuralForecaster"))?;

        let (panel, meta, cutoff) = match y {
            Some(y) => {
                y.require_freq()?;
                (y.to_array3()?, y.meta(), y.cutoff()?)
            }
            None => (
                fitted.history.clone(),
                fitted.meta.clone(),
                fitted.cutoff,
            ),
        };
        if meta.columns != fitted.meta.columns {
            return Err(DataError::IndexMismatch(format!(
                "columns {:?} differ from the fitted columns {:?}",
                meta.columns, fitted.meta.columns
            ))
            .into());
        }

        let fh = match fh {
            Some(fh) => fh.to_relative(&cutoff, meta.freq.as_ref())?,
            None => ForecastingHorizon::range(fitted.pred_len)?,
        };
        fh.ensure_out_of_sample()?;
        let requested = fh.max_offset().unwrap_or(0);
        if requested > fitted.pred_len as i64 {
            return Err(TrainError::HorizonExceedsMaximum {
                requested,
                max: fitted.pred_len,
            });
        }

        let (n_instances, series_length, n_vars) = panel.dim();
        if series_length < fitted.seq_len {
            return Err(TrainError::InsufficientHistory(format!(
                "the network needs {} observations per instance, got {}",
                fitted.seq_len, series_length
            )));
        }

        let exog = self.inference_exogenous(fitted, x, y.is_some(), &cutoff)?;
        let mut dataset = WindowedDataset::inference(panel.view(), fitted.seq_len)?;
        if let Some(exog) = &exog {
            dataset = dataset.with_exogenous(exog.view())?;
        }
        let mut loader = WindowLoader::builder(dataset)
            .batch_size(self.config.batch_size)
            .split(Split::Predict)
            .build()?;

        let mut outputs = Vec::with_capacity(loader.len());
        for batch in loader.iter::<B::InnerBackend>(&self.device) {
            let output = fitted.network.forward(batch?.inputs);
            let [batch_size, steps, vars] = output.dims();
            outputs.push(output.slice([0..batch_size, fitted.label_len..steps, 0..vars]));
        }
        let predictions = Tensor::cat(outputs, 0)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| TrainError::Tensor(format!("{:?}", e)))?;
        let predictions = Array3::from_shape_vec((n_instances, fitted.pred_len, n_vars), predictions)
            .map_err(|e| TrainError::Tensor(e.to_string()))?;

        Ok(reconstruct_forecast(&meta, predictions.view(), &cutoff, &fh)?)
    }

    fn inference_exogenous(
        &self,
        fitted: &Fitted<<A::Network as AutodiffModule<B>>::InnerModule>,
        x: Option<&PanelFrame>,
        global: bool,
        cutoff: &TimePoint,
    ) -> Result<Option<Array3<f32>>> {
        let columns = self.architecture.exogenous_columns();
        if columns.is_empty() {
            return Ok(None);
        }
        let x = x.ok_or_else(|| TrainError::MissingExogenous(columns.clone()))?;
        let (before, after) = x.select_columns(&columns)?.split_at(cutoff);
        if after.n_rows() == 0 {
            return Err(DataError::InvalidShape(format!(
                "exogenous data must cover the forecast period after {}",
                cutoff
            ))
            .into());
        }
        let future = after.to_array3()?;
        let in_sample = if before.n_rows() > 0 {
            before.to_array3()?
        } else if !global {
            fitted
                .exog_in_sample
                .clone()
                .ok_or_else(|| TrainError::MissingExogenous(columns.clone()))?
        } else {
            return Err(TrainError::MissingExogenous(columns));
        };
        Ok(Some(assemble_inference_exogenous(
            in_sample.view(),
            future.view(),
            fitted.seq_len,
            fitted.pred_len,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_autodiff::Autodiff;
    use burn_ndarray::NdArray;
    use ndarray::Array2;
    use tsforge_models::{LTSFLinearConfig, LstmForecasterConfig};

    type TestBackend = Autodiff<NdArray>;

    fn series(length: usize) -> PanelFrame {
        let values = Array2::from_shape_fn((length, 1), |(t, _)| (t as f32 * 0.3).sin());
        PanelFrame::from_series(
            (0..length as i64).map(TimePoint::Int).collect(),
            vec!["y".to_string()],
            values,
        )
        .unwrap()
    }

    fn quick() -> ForecasterConfig {
        ForecasterConfig::default()
            .with_num_epochs(2)
            .with_batch_size(4)
            .with_seed(Seed::new(3))
    }

    #[test]
    fn test_default_config() {
        let config = ForecasterConfig::default();
        assert_eq!(config.num_epochs, 16);
        assert_eq!(config.batch_size, 8);
        assert_eq!(config.lr, 1e-3);
        assert!(config.shuffle);
        assert!(config.optimizer.is_none());
    }

    #[test]
    fn test_config_serde_defaults() {
        let config: ForecasterConfig =
            serde_json::from_str(r#"{"num_epochs": 3, "optimizer": "SGD"}"#).unwrap();
        assert_eq!(config.num_epochs, 3);
        assert_eq!(config.optimizer.as_deref(), Some("SGD"));
        assert_eq!(config.batch_size, 8);
    }

    #[test]
    fn test_fit_predict_integer_index() {
        let y = series(30);
        let mut forecaster =
            NeuralForecaster::<TestBackend, _>::new(LTSFLinearConfig::new(6), quick(), Default::default());
        let fh = ForecastingHorizon::range(3).unwrap();
        forecaster.fit(&y, None, Some(&fh)).unwrap();

        assert!(forecaster.is_fitted());
        assert_eq!(forecaster.pred_len(), Some(3));
        assert_eq!(forecaster.epoch_losses().map(<[f32]>::len), Some(2));

        let forecast = forecaster.predict(None, None, None).unwrap();
        assert_eq!(
            forecast.index().times(),
            &[TimePoint::Int(30), TimePoint::Int(31), TimePoint::Int(32)]
        );
        assert_eq!(forecast.columns(), &["y".to_string()]);
    }

    #[test]
    fn test_label_len_steps_dropped() {
        let y = series(30);
        let arch = LstmForecasterConfig::new(8).with_hidden_size(4).with_label_len(3);
        let mut forecaster =
            NeuralForecaster::<TestBackend, _>::new(arch, quick(), Default::default());
        forecaster
            .fit(&y, None, Some(&ForecastingHorizon::range(2).unwrap()))
            .unwrap();
        let forecast = forecaster.predict(None, None, None).unwrap();
        assert_eq!(forecast.n_rows(), 2);
    }

    #[test]
    fn test_row_order_does_not_change_forecast() {
        let ascending = series(30);
        let reversed_rows: Vec<usize> = (0..30).rev().collect();
        let newest_first = PanelFrame::from_series(
            reversed_rows.iter().map(|&t| TimePoint::Int(t as i64)).collect(),
            vec!["y".to_string()],
            ascending.values().select(ndarray::Axis(0), &reversed_rows),
        )
        .unwrap();

        let fh = ForecastingHorizon::range(2).unwrap();
        let forecast = |y: &PanelFrame| {
            let mut forecaster = NeuralForecaster::<TestBackend, _>::new(
                LTSFLinearConfig::new(4),
                quick(),
                Default::default(),
            );
            forecaster.fit(y, None, Some(&fh)).unwrap();
            forecaster.predict(None, None, None).unwrap()
        };
        assert_eq!(forecast(&ascending), forecast(&newest_first));
    }

    #[test]
    fn test_irregular_calendar_index_fails_at_fit() {
        let day = |d: u32| TimePoint::from(chrono::NaiveDate::from_ymd_opt(2024, 1, d).unwrap());
        let days = [1, 2, 4, 5, 8, 9, 10, 12, 15, 16, 17, 20];
        let y = PanelFrame::from_series(
            days.iter().map(|&d| day(d)).collect(),
            vec!["y".to_string()],
            Array2::from_shape_fn((days.len(), 1), |(t, _)| t as f32),
        )
        .unwrap();
        let mut forecaster = NeuralForecaster::<TestBackend, _>::new(
            LTSFLinearConfig::new(4),
            quick(),
            Default::default(),
        );
        let err = forecaster
            .fit(&y, None, Some(&ForecastingHorizon::range(2).unwrap()))
            .unwrap_err();
        assert!(matches!(
            err,
            TrainError::Data(DataError::CoreError(tsforge_core::CoreError::MissingFrequency(_)))
        ));
        assert!(!forecaster.is_fitted());
    }

    #[test]
    fn test_predict_before_fit() {
        let forecaster = NeuralForecaster::<TestBackend, _>::new(
            LTSFLinearConfig::new(4),
            quick(),
            Default::default(),
        );
        assert!(matches!(
            forecaster.predict(None, None, None),
            Err(TrainError::NotFitted(_))
        ));
    }

    #[test]
    fn test_missing_horizon() {
        let mut forecaster = NeuralForecaster::<TestBackend, _>::new(
            LTSFLinearConfig::new(4),
            quick(),
            Default::default(),
        );
        assert!(matches!(
            forecaster.fit(&series(20), None, None),
            Err(TrainError::MissingHorizon)
        ));

        let mut forecaster = NeuralForecaster::<TestBackend, _>::new(
            LTSFLinearConfig::new(4),
            quick().with_default_horizon(2),
            Default::default(),
        );
        forecaster.fit(&series(20), None, None).unwrap();
        assert_eq!(forecaster.pred_len(), Some(2));
    }

    #[test]
    fn test_horizon_beyond_fitted() {
        let mut forecaster = NeuralForecaster::<TestBackend, _>::new(
            LTSFLinearConfig::new(4),
            quick(),
            Default::default(),
        );
        forecaster
            .fit(&series(20), None, Some(&ForecastingHorizon::range(2).unwrap()))
            .unwrap();
        let fh = ForecastingHorizon::relative([1, 3]).unwrap();
        assert!(matches!(
            forecaster.predict(Some(&fh), None, None),
            Err(TrainError::HorizonExceedsMaximum { requested: 3, max: 2 })
        ));
    }

    #[test]
    fn test_failed_refit_leaves_unfitted() {
        let mut forecaster = NeuralForecaster::<TestBackend, _>::new(
            LTSFLinearConfig::new(4),
            quick(),
            Default::default(),
        );
        forecaster
            .fit(&series(20), None, Some(&ForecastingHorizon::range(2).unwrap()))
            .unwrap();
        assert!(forecaster
            .fit(&series(5), None, Some(&ForecastingHorizon::range(2).unwrap()))
            .is_err());
        assert!(!forecaster.is_fitted());
    }
}
