//! Name-keyed optimizer and criterion registries.
//!
//! Each registry is a fixed, case-sensitive map from name to constructor.
//! Constructors receive keyword arguments as a JSON object and reject keys
//! they do not understand, so a typo fails before any training starts.
//!
//! ## Example
//!
//! ```rust
//! use tsforge_train::registry::{optimizer_names, regression_criterion_names};
//!
//! assert!(optimizer_names().contains(&"AdamW"));
//! assert_eq!(regression_criterion_names(), vec!["HuberLoss", "L1Loss", "MSELoss"]);
//! ```

use std::collections::BTreeMap;

use burn::module::AutodiffModule;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::momentum::MomentumConfig;
use burn::optim::{
    AdaGradConfig, AdamConfig, AdamWConfig, GradientsParams, Optimizer, RmsPropConfig, SgdConfig,
};
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;
use serde_json::{Map, Value};

use crate::error::{Result, TrainError};
use crate::kwargs::Kwargs;
use crate::losses::{
    ClassificationCriterion, CrossEntropyLoss, FocalLoss, HuberLoss, L1Loss, MSELoss,
    RegressionCriterion,
};

/// Optimizer used when none is configured.
pub const DEFAULT_OPTIMIZER: &str = "Adam";

/// Object-safe view of a burn [`Optimizer`].
///
/// burn optimizers carry an associated record type, which keeps them out of
/// trait objects. Every optimizer implements this trait, so registries can
/// hand out boxed optimizers chosen by name at runtime.
pub trait ModuleOptimizer<M, B>: Send
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    /// Apply one update with learning rate `lr`.
    fn step(&mut self, lr: f64, module: M, grads: GradientsParams) -> M;
}

impl<M, B, O> ModuleOptimizer<M, B> for O
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    fn step(&mut self, lr: f64, module: M, grads: GradientsParams) -> M {
        Optimizer::step(self, lr, module, grads)
    }
}

/// An optimizer resolved from the registry, bound to its learning rate.
pub struct ConfiguredOptimizer<M, B>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    name: &'static str,
    lr: f64,
    inner: Box<dyn ModuleOptimizer<M, B>>,
}

impl<M, B> ConfiguredOptimizer<M, B>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    /// Registry name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Learning rate applied at every step.
    pub fn lr(&self) -> f64 {
        self.lr
    }

    /// Update `module` with `grads`.
    pub fn step(&mut self, module: M, grads: GradientsParams) -> M {
        self.inner.step(self.lr, module, grads)
    }
}

impl<M, B> std::fmt::Debug for ConfiguredOptimizer<M, B>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredOptimizer")
            .field("name", &self.name)
            .field("lr", &self.lr)
            .finish_non_exhaustive()
    }
}

type OptimizerFactory<M, B> = fn(&Kwargs<'_>) -> Result<Box<dyn ModuleOptimizer<M, B>>>;

fn weight_decay(kwargs: &Kwargs<'_>) -> Result<Option<WeightDecayConfig>> {
    Ok(kwargs
        .non_negative("weight_decay")?
        .map(|penalty| WeightDecayConfig::new(penalty as f32)))
}

fn adam<M, B>(kwargs: &Kwargs<'_>) -> Result<Box<dyn ModuleOptimizer<M, B>>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + 'static,
{
    kwargs.allow(&["beta_1", "beta_2", "epsilon", "weight_decay"])?;
    let mut config = AdamConfig::new().with_weight_decay(weight_decay(kwargs)?);
    if let Some(beta_1) = kwargs.f32("beta_1")? {
        config = config.with_beta_1(beta_1);
    }
    if let Some(beta_2) = kwargs.f32("beta_2")? {
        config = config.with_beta_2(beta_2);
    }
    if let Some(epsilon) = kwargs.f32("epsilon")? {
        config = config.with_epsilon(epsilon);
    }
    Ok(Box::new(config.init::<B, M>()))
}

fn adamw<M, B>(kwargs: &Kwargs<'_>) -> Result<Box<dyn ModuleOptimizer<M, B>>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + 'static,
{
    kwargs.allow(&["beta_1", "beta_2", "epsilon", "weight_decay"])?;
    let mut config = AdamWConfig::new();
    if let Some(beta_1) = kwargs.f32("beta_1")? {
        config = config.with_beta_1(beta_1);
    }
    if let Some(beta_2) = kwargs.f32("beta_2")? {
        config = config.with_beta_2(beta_2);
    }
    if let Some(epsilon) = kwargs.f32("epsilon")? {
        config = config.with_epsilon(epsilon);
    }
    if let Some(penalty) = kwargs.non_negative("weight_decay")? {
        config = config.with_weight_decay(penalty as f32);
    }
    Ok(Box::new(config.init::<B, M>()))
}

fn sgd<M, B>(kwargs: &Kwargs<'_>) -> Result<Box<dyn ModuleOptimizer<M, B>>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + 'static,
{
    kwargs.allow(&["momentum", "dampening", "nesterov", "weight_decay"])?;
    let momentum = match kwargs.non_negative("momentum")? {
        Some(momentum) if momentum > 0.0 => {
            let mut config = MomentumConfig::new().with_momentum(momentum).with_dampening(0.0);
            if let Some(dampening) = kwargs.non_negative("dampening")? {
                config = config.with_dampening(dampening);
            }
            if let Some(nesterov) = kwargs.bool("nesterov")? {
                config = config.with_nesterov(nesterov);
            }
            Some(config)
        }
        _ => {
            if kwargs.contains("dampening") || kwargs.contains("nesterov") {
                return Err(TrainError::InvalidKwargs {
                    target: "SGD".to_string(),
                    reason: "'dampening' and 'nesterov' require a positive 'momentum'".to_string(),
                });
            }
            None
        }
    };
    let config = SgdConfig::new()
        .with_weight_decay(weight_decay(kwargs)?)
        .with_momentum(momentum);
    Ok(Box::new(config.init::<B, M>()))
}

fn rmsprop<M, B>(kwargs: &Kwargs<'_>) -> Result<Box<dyn ModuleOptimizer<M, B>>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + 'static,
{
    kwargs.allow(&["alpha", "epsilon", "momentum", "centered", "weight_decay"])?;
    let mut config = RmsPropConfig::new().with_weight_decay(weight_decay(kwargs)?);
    if let Some(alpha) = kwargs.f32("alpha")? {
        config = config.with_alpha(alpha);
    }
    if let Some(epsilon) = kwargs.f32("epsilon")? {
        config = config.with_epsilon(epsilon);
    }
    if let Some(momentum) = kwargs.non_negative("momentum")? {
        config = config.with_momentum(momentum as f32);
    }
    if let Some(centered) = kwargs.bool("centered")? {
        config = config.with_centered(centered);
    }
    Ok(Box::new(config.init::<B, M>()))
}

fn adagrad<M, B>(kwargs: &Kwargs<'_>) -> Result<Box<dyn ModuleOptimizer<M, B>>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + 'static,
{
    kwargs.allow(&["lr_decay", "epsilon", "weight_decay"])?;
    let mut config = AdaGradConfig::new().with_weight_decay(weight_decay(kwargs)?);
    if let Some(lr_decay) = kwargs.non_negative("lr_decay")? {
        config = config.with_lr_decay(lr_decay);
    }
    if let Some(epsilon) = kwargs.f32("epsilon")? {
        config = config.with_epsilon(epsilon);
    }
    Ok(Box::new(config.init::<B, M>()))
}

fn optimizers<M, B>() -> BTreeMap<&'static str, OptimizerFactory<M, B>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + 'static,
{
    let mut registry: BTreeMap<&'static str, OptimizerFactory<M, B>> = BTreeMap::new();
    registry.insert("Adam", adam::<M, B>);
    registry.insert("AdamW", adamw::<M, B>);
    registry.insert("SGD", sgd::<M, B>);
    registry.insert("RMSprop", rmsprop::<M, B>);
    registry.insert("Adagrad", adagrad::<M, B>);
    registry
}

const OPTIMIZER_NAMES: [&str; 5] = ["Adagrad", "Adam", "AdamW", "RMSprop", "SGD"];

/// Registered optimizer names, sorted.
pub fn optimizer_names() -> Vec<&'static str> {
    OPTIMIZER_NAMES.to_vec()
}

fn unknown_optimizer(name: &str) -> TrainError {
    TrainError::UnknownOptimizer {
        name: name.to_string(),
        valid: optimizer_names().into_iter().map(String::from).collect(),
    }
}

/// Build the optimizer registered as `name`, or Adam when `name` is `None`.
///
/// `kwargs` are applied to the chosen optimizer in both cases.
///
/// # Errors
///
/// Returns [`TrainError::UnknownOptimizer`] for an unregistered name,
/// [`TrainError::InvalidKwargs`] for unknown or mistyped arguments, and
/// [`TrainError::InvalidConfig`] for a learning rate that is not a positive
/// finite number.
pub fn instantiate_optimizer<M, B>(
    name: Option<&str>,
    kwargs: &Map<String, Value>,
    lr: f64,
) -> Result<ConfiguredOptimizer<M, B>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + 'static,
{
    if !(lr.is_finite() && lr > 0.0) {
        return Err(TrainError::InvalidConfig(format!(
            "learning rate must be a positive finite number, got {}",
            lr
        )));
    }
    let name = name.unwrap_or(DEFAULT_OPTIMIZER);
    let registry = optimizers::<M, B>();
    let (&name, factory) = registry
        .get_key_value(name)
        .ok_or_else(|| unknown_optimizer(name))?;
    let inner = factory(&Kwargs::new(name, kwargs))?;
    tracing::debug!("Instantiated optimizer {} with lr={}", name, lr);
    Ok(ConfiguredOptimizer { name, lr, inner })
}

type RegressionFactory<B> = fn(&Kwargs<'_>) -> Result<Box<dyn RegressionCriterion<B>>>;
type ClassificationFactory<B> = fn(&Kwargs<'_>) -> Result<Box<dyn ClassificationCriterion<B>>>;

fn regression_criteria<B: Backend>() -> BTreeMap<&'static str, RegressionFactory<B>> {
    let mut registry: BTreeMap<&'static str, RegressionFactory<B>> = BTreeMap::new();
    registry.insert("MSELoss", |kwargs| {
        kwargs.allow(&[])?;
        Ok(Box::new(MSELoss))
    });
    registry.insert("L1Loss", |kwargs| {
        kwargs.allow(&[])?;
        Ok(Box::new(L1Loss))
    });
    registry.insert("HuberLoss", |kwargs| {
        kwargs.allow(&["delta"])?;
        let delta = kwargs.non_negative("delta")?.unwrap_or(1.0);
        if delta == 0.0 {
            return Err(TrainError::InvalidKwargs {
                target: "HuberLoss".to_string(),
                reason: "'delta' must be positive".to_string(),
            });
        }
        Ok(Box::new(HuberLoss::new(delta as f32)))
    });
    registry
}

fn classification_criteria<B: Backend>() -> BTreeMap<&'static str, ClassificationFactory<B>> {
    let mut registry: BTreeMap<&'static str, ClassificationFactory<B>> = BTreeMap::new();
    registry.insert("CrossEntropyLoss", |kwargs| {
        kwargs.allow(&["label_smoothing"])?;
        let smoothing = kwargs.non_negative("label_smoothing")?;
        if smoothing.is_some_and(|s| s > 1.0) {
            return Err(TrainError::InvalidKwargs {
                target: "CrossEntropyLoss".to_string(),
                reason: "'label_smoothing' must be in [0, 1]".to_string(),
            });
        }
        Ok(Box::new(CrossEntropyLoss::new(smoothing.map(|s| s as f32))))
    });
    registry.insert("FocalLoss", |kwargs| {
        kwargs.allow(&["gamma"])?;
        let gamma = kwargs.non_negative("gamma")?.unwrap_or(2.0);
        Ok(Box::new(FocalLoss::new(gamma as f32)))
    });
    registry
}

const REGRESSION_CRITERIA: [&str; 3] = ["HuberLoss", "L1Loss", "MSELoss"];
const CLASSIFICATION_CRITERIA: [&str; 2] = ["CrossEntropyLoss", "FocalLoss"];

/// Registered regression criterion names, sorted.
pub fn regression_criterion_names() -> Vec<&'static str> {
    REGRESSION_CRITERIA.to_vec()
}

/// Registered classification criterion names, sorted.
pub fn classification_criterion_names() -> Vec<&'static str> {
    CLASSIFICATION_CRITERIA.to_vec()
}

fn lookup<'r, F>(
    registry: &'r BTreeMap<&'static str, F>,
    name: &str,
) -> Result<(&'static str, &'r F)> {
    registry
        .get_key_value(name)
        .map(|(&name, factory)| (name, factory))
        .ok_or_else(|| TrainError::UnknownCriterion {
            name: name.to_string(),
            valid: registry.keys().map(|k| k.to_string()).collect(),
        })
}

/// Build the regression criterion registered as `name`, or `default`.
///
/// # Errors
///
/// Returns [`TrainError::UnknownCriterion`] listing the registered names, or
/// [`TrainError::InvalidKwargs`] for bad arguments.
pub fn instantiate_regression_criterion<B: Backend>(
    name: Option<&str>,
    default: &str,
    kwargs: &Map<String, Value>,
) -> Result<Box<dyn RegressionCriterion<B>>> {
    let registry = regression_criteria::<B>();
    let (name, factory) = lookup(&registry, name.unwrap_or(default))?;
    factory(&Kwargs::new(name, kwargs))
}

/// Build the classification criterion registered as `name`, or `default`.
///
/// # Errors
///
/// Returns [`TrainError::UnknownCriterion`] listing the registered names, or
/// [`TrainError::InvalidKwargs`] for bad arguments.
pub fn instantiate_classification_criterion<B: Backend>(
    name: Option<&str>,
    default: &str,
    kwargs: &Map<String, Value>,
) -> Result<Box<dyn ClassificationCriterion<B>>> {
    let registry = classification_criteria::<B>();
    let (name, factory) = lookup(&registry, name.unwrap_or(default))?;
    factory(&Kwargs::new(name, kwargs))
}
