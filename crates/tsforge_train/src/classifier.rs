//! Neural classifier front-end.

use std::collections::BTreeSet;

use burn::module::AutodiffModule;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use ndarray::{Array2, ArrayView3};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, TrainError};
use crate::registry::{instantiate_classification_criterion, instantiate_optimizer};
use crate::training::Trainer;
use tsforge_core::{ClassificationArchitecture, ClassificationNetwork, Seed, Split};
use tsforge_data::{ClassificationDataset, DataError, PanelFrame, WindowLoader};

/// Configuration for [`NeuralClassifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Number of training epochs.
    pub num_epochs: usize,
    /// Instances per batch.
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
    /// Shuffle instances every epoch.
    pub shuffle: bool,
    /// Seed for network initialization and shuffling.
    pub seed: Seed,
    /// Log per-epoch losses at info level.
    pub verbose: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            num_epochs: 16,
            batch_size: 8,
            lr: 1e-3,
            optimizer: None,
            optimizer_kwargs: Map::new(),
            criterion: None,
            criterion_kwargs: Map::new(),
            shuffle: false,
            seed: Seed::default(),
            verbose: true,
        }
    }
}

impl ClassifierConfig {
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
}

struct Fitted<N> {
    network: N,
    /// Sorted distinct labels; position is the class index.
    classes: Vec<i64>,
    n_vars: usize,
    epoch_losses: Vec<f32>,
}

/// Fit/predict classifier over a classification architecture.
///
/// Inputs are `(instance, variable, time)` arrays or panel frames. Labels
/// are arbitrary integers, encoded to class indices in sorted order.
pub struct NeuralClassifier<B, A>
where
    B: AutodiffBackend,
    A: ClassificationArchitecture<B>,
{
    architecture: A,
    config: ClassifierConfig,
    device: B::Device,
    fitted: Option<Fitted<<A::Network as AutodiffModule<B>>::InnerModule>>,
}

impl<B, A> NeuralClassifier<B, A>
where
    B: AutodiffBackend,
    A: ClassificationArchitecture<B>,
    A::Network: 'static,
    <A::Network as AutodiffModule<B>>::InnerModule: ClassificationNetwork<B::InnerBackend>,
{
    /// Create an unfitted classifier.
    pub fn new(architecture: A, config: ClassifierConfig, device: B::Device) -> Self {
        Self {
            architecture,
            config,
            device,
            fitted: None,
        }
    }

    /// The estimator configuration.
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Whether `fit` has completed.
    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Labels seen at fit time, in class-index order.
    pub fn classes(&self) -> Option<&[i64]> {
        self.fitted.as_ref().map(|f| f.classes.as_slice())
    }

    /// Per-epoch training losses of the last fit.
    pub fn epoch_losses(&self) -> Option<&[f32]> {
        self.fitted.as_ref().map(|f| f.epoch_losses.as_slice())
    }

    /// Train a fresh network on `(instance, variable, time)` data.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown optimizer or criterion
    /// names, and a shape error when `y` does not have one label per
    /// instance.
    pub fn fit(&mut self, x: ArrayView3<'_, f32>, y: &[i64]) -> Result<()> {
        self.fitted = None;
        if self.config.batch_size == 0 {
            return Err(TrainError::InvalidConfig(
                "batch_size must be positive".to_string(),
            ));
        }

        let criterion = instantiate_classification_criterion::<B>(
            self.config.criterion.as_deref(),
            self.architecture.default_criterion(),
            &self.config.criterion_kwargs,
        )?;
        let mut optim = instantiate_optimizer::<A::Network, B>(
            self.config.optimizer.as_deref(),
            &self.config.optimizer_kwargs,
            self.config.lr,
        )?;

        let (n_instances, n_vars, seq_len) = x.dim();
        if n_instances == 0 {
            return Err(DataError::EmptyDataset.into());
        }
        if y.len() != n_instances {
            return Err(DataError::InvalidShape(format!(
                "{} labels for {} instances",
                y.len(),
                n_instances
            ))
            .into());
        }
        let classes: Vec<i64> = y.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        let encoded: Vec<usize> = y
            .iter()
            .filter_map(|label| classes.binary_search(label).ok())
            .collect();

        B::seed(self.config.seed.derive("init").value());
        let network =
            self.architecture
                .build_network(n_vars, seq_len, classes.len(), &self.device)?;

        let dataset = ClassificationDataset::new(x.view(), Some(encoded.as_slice()))?;
        let mut loader = WindowLoader::builder(dataset)
            .batch_size(self.config.batch_size)
            .shuffle(self.config.shuffle)
            .seed(self.config.seed.derive("shuffle"))
            .split(Split::Train)
            .build()?;

        tracing::info!(
            "Fitting {} on {} instances ({} variables, {} steps, {} classes)",
            self.architecture.name(),
            n_instances,
            n_vars,
            seq_len,
            classes.len()
        );

        let trainer = Trainer::<B>::new(
            self.device.clone(),
            self.config.num_epochs,
            self.config.verbose,
        );
        let output = trainer.fit_with_loss(network, &mut optim, &mut loader, |network, batch| {
            let target = batch.target.ok_or_else(|| {
                TrainError::InvalidConfig("training batch without labels".to_string())
            })?;
            let logits = network.forward(batch.x, batch.padding_mask);
            Ok(criterion.forward(logits, target))
        })?;

        self.fitted = Some(Fitted {
            network: output.model.valid(),
            classes,
            n_vars,
            epoch_losses: output.epoch_losses,
        });
        Ok(())
    }

    /// Train on a panel frame, one instance per series.
    ///
    /// # Errors
    ///
    /// See [`NeuralClassifier::fit`]; ragged panels are rejected.
    pub fn fit_frame(&mut self, x: &PanelFrame, y: &[i64]) -> Result<()> {
        let array = x.to_classification_array()?;
        self.fit(array.view(), y)
    }

    /// Class probabilities, `(instances, classes)`.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::NotFitted`] before `fit` and a shape error when
    /// the variable count differs from the training data.
    pub fn predict_proba(&self, x: ArrayView3<'_, f32>) -> Result<Array2<f32>> {
        let fitted = self
            .fitted
            .as_ref()
            .ok_or(TrainError::NotFitted("NeuralClassifier"))?;
        let (n_instances, n_vars, _) = x.dim();
        if n_vars != fitted.n_vars {
            return Err(DataError::InvalidShape(format!(
                "fitted on {} variables, got {}",
                fitted.n_vars, n_vars
            ))
            .into());
        }

        let dataset = ClassificationDataset::new(x, None)?;
        let mut loader = WindowLoader::builder(dataset)
            .batch_size(self.config.batch_size)
            .split(Split::Predict)
            .build()?;

        let mut probs = Vec::with_capacity(loader.len());
        for batch in loader.iter::<B::InnerBackend>(&self.device) {
            let batch = batch?;
            probs.push(fitted.network.forward_probs(batch.x, batch.padding_mask));
        }
        let values = Tensor::cat(probs, 0)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| TrainError::Tensor(format!("{:?}", e)))?;
        Array2::from_shape_vec((n_instances, fitted.classes.len()), values)
            .map_err(|e| TrainError::Tensor(e.to_string()))
    }

    /// Most probable label per instance.
    ///
    /// # Errors
    ///
    /// See [`NeuralClassifier::predict_proba`].
    pub fn predict(&self, x: ArrayView3<'_, f32>) -> Result<Vec<i64>> {
        let probs = self.predict_proba(x)?;
        let classes = self.classes().ok_or(TrainError::NotFitted("NeuralClassifier"))?;
        Ok(probs
            .rows()
            .into_iter()
            .map(|row| {
                let best = row
                    .iter()
                    .enumerate()
                    .fold((0, f32::NEG_INFINITY), |best, (i, &p)| {
                        if p > best.1 {
                            (i, p)
                        } else {
                            best
                        }
                    })
                    .0;
                classes[best]
            })
            .collect())
    }

    /// [`NeuralClassifier::predict_proba`] on a panel frame.
    ///
    /// # Errors
    ///
    /// See [`NeuralClassifier::predict_proba`].
    pub fn predict_proba_frame(&self, x: &PanelFrame) -> Result<Array2<f32>> {
        let array = x.to_classification_array()?;
        self.predict_proba(array.view())
    }

    /// [`NeuralClassifier::predict`] on a panel frame.
    ///
    /// # Errors
    ///
    /// See [`NeuralClassifier::predict_proba`].
    pub fn predict_frame(&self, x: &PanelFrame) -> Result<Vec<i64>> {
        let array = x.to_classification_array()?;
        self.predict(array.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_autodiff::Autodiff;
    use burn_ndarray::NdArray;
    use ndarray::Array3;
    use tsforge_models::RnnClassifierConfig;

    type TestBackend = Autodiff<NdArray>;

    fn toy() -> (Array3<f32>, Vec<i64>) {
        let x = Array3::from_shape_fn((6, 2, 10), |(i, v, t)| {
            if i % 2 == 0 {
                (t + v) as f32 * 0.1
            } else {
                -((t + v) as f32) * 0.1
            }
        });
        let y = (0..6).map(|i| if i % 2 == 0 { 7 } else { -3 }).collect();
        (x, y)
    }

    fn classifier() -> NeuralClassifier<TestBackend, RnnClassifierConfig> {
        NeuralClassifier::new(
            RnnClassifierConfig::default().with_hidden_size(8),
            ClassifierConfig::default()
                .with_num_epochs(3)
                .with_batch_size(4)
                .with_verbose(false),
            Default::default(),
        )
    }

    #[test]
    fn test_default_config() {
        let config = ClassifierConfig::default();
        assert!(config.verbose);
        assert!(!config.shuffle);
        assert_eq!(config.batch_size, 8);
    }

    #[test]
    fn test_labels_encoded_and_decoded() {
        let (x, y) = toy();
        let mut clf = classifier();
        clf.fit(x.view(), &y).unwrap();
        assert_eq!(clf.classes(), Some(&[-3, 7][..]));
        assert_eq!(clf.epoch_losses().map(<[f32]>::len), Some(3));

        let probs = clf.predict_proba(x.view()).unwrap();
        assert_eq!(probs.dim(), (6, 2));
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-5);
        }

        let labels = clf.predict(x.view()).unwrap();
        assert_eq!(labels.len(), 6);
        assert!(labels.iter().all(|l| *l == 7 || *l == -3));
    }

    #[test]
    fn test_fit_keeps_no_borrow_of_inputs() {
        let mut clf = classifier();
        {
            let (x, y) = toy();
            clf.fit(x.view(), &y).unwrap();
        }
        let (x, _) = toy();
        assert_eq!(clf.predict(x.view()).unwrap().len(), 6);
    }

    #[test]
    fn test_label_count_checked() {
        let (x, _) = toy();
        let mut clf = classifier();
        assert!(matches!(
            clf.fit(x.view(), &[1, 2]),
            Err(TrainError::Data(DataError::InvalidShape(_)))
        ));
    }

    #[test]
    fn test_variable_count_checked() {
        let (x, y) = toy();
        let mut clf = classifier();
        clf.fit(x.view(), &y).unwrap();
        let wrong = Array3::<f32>::zeros((2, 3, 10));
        assert!(clf.predict(wrong.view()).is_err());
    }

    #[test]
    fn test_unknown_criterion_before_training() {
        let (x, y) = toy();
        let mut clf = NeuralClassifier::<TestBackend, _>::new(
            RnnClassifierConfig::default(),
            ClassifierConfig::default().with_criterion("NLLLoss", Map::new()),
            Default::default(),
        );
        assert!(matches!(
            clf.fit(x.view(), &y),
            Err(TrainError::UnknownCriterion { .. })
        ));
        assert!(!clf.is_fitted());
    }
}
