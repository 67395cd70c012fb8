//! Loss functions.
//!
//! Regression criteria compare `(batch, steps, vars)` forecasts with their
//! targets; classification criteria compare `(batch, classes)` logits with
//! class indices. All of them reduce to a mean and stay differentiable.

use burn::nn::loss::CrossEntropyLossConfig;
use burn::prelude::*;
use burn::tensor::activation::log_softmax;

/// A loss over forecast windows.
pub trait RegressionCriterion<B: Backend>: Send + Sync {
    /// Registry name of the criterion.
    fn name(&self) -> &'static str;

    /// Mean loss of `predictions` against `targets`, both `(batch, steps, vars)`.
    fn forward(&self, predictions: Tensor<B, 3>, targets: Tensor<B, 3>) -> Tensor<B, 1>;
}

/// A loss over class logits.
pub trait ClassificationCriterion<B: Backend>: Send + Sync {
    /// Registry name of the criterion.
    fn name(&self) -> &'static str;

    /// Mean loss of `(batch, classes)` logits against `(batch,)` class indices.
    fn forward(&self, logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1>;
}

/// Mean squared error.
#[derive(Debug, Clone, Copy, Default)]
pub struct MSELoss;

impl<B: Backend> RegressionCriterion<B> for MSELoss {
    fn name(&self) -> &'static str {
        "MSELoss"
    }

    fn forward(&self, predictions: Tensor<B, 3>, targets: Tensor<B, 3>) -> Tensor<B, 1> {
        (predictions - targets).powf_scalar(2.0).mean()
    }
}

/// Mean absolute error.
#[derive(Debug, Clone, Copy, Default)]
pub struct L1Loss;

impl<B: Backend> RegressionCriterion<B> for L1Loss {
    fn name(&self) -> &'static str {
        "L1Loss"
    }

    fn forward(&self, predictions: Tensor<B, 3>, targets: Tensor<B, 3>) -> Tensor<B, 1> {
        (predictions - targets).abs().mean()
    }
}

/// Huber loss (smooth L1).
///
/// L = 0.5 * (y - pred)^2                   if |y - pred| <= delta
/// L = delta * (|y - pred| - 0.5 * delta)   otherwise
#[derive(Debug, Clone, Copy)]
pub struct HuberLoss {
    /// Threshold between L2 and L1 behavior.
    pub delta: f32,
}

impl HuberLoss {
    /// Create a new Huber loss.
    pub fn new(delta: f32) -> Self {
        Self { delta }
    }
}

impl Default for HuberLoss {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl<B: Backend> RegressionCriterion<B> for HuberLoss {
    fn name(&self) -> &'static str {
        "HuberLoss"
    }

    fn forward(&self, predictions: Tensor<B, 3>, targets: Tensor<B, 3>) -> Tensor<B, 1> {
        let diff = predictions - targets;
        let abs = diff.clone().abs();
        let quadratic = diff.powf_scalar(2.0).mul_scalar(0.5);
        let linear = abs
            .clone()
            .sub_scalar(0.5 * self.delta)
            .mul_scalar(self.delta);
        let inside = abs.lower_equal_elem(self.delta);
        linear.mask_where(inside, quadratic).mean()
    }
}

/// Cross-entropy over logits, with optional label smoothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss {
    /// Smoothing factor in `[0, 1]`; `None` disables smoothing.
    pub label_smoothing: Option<f32>,
}

impl CrossEntropyLoss {
    /// Create a new cross-entropy loss.
    pub fn new(label_smoothing: Option<f32>) -> Self {
        Self { label_smoothing }
    }
}

impl<B: Backend> ClassificationCriterion<B> for CrossEntropyLoss {
    fn name(&self) -> &'static str {
        "CrossEntropyLoss"
    }

    fn forward(&self, logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
        let loss = CrossEntropyLossConfig::new()
            .with_smoothing(self.label_smoothing)
            .init(&logits.device());
        loss.forward(logits, targets)
    }
}

/// Focal loss for imbalanced classes.
///
/// FL(p_t) = -(1 - p_t)^gamma * log(p_t)
///
/// Reference: "Focal Loss for Dense Object Detection" by Lin et al. (2017)
#[derive(Debug, Clone, Copy)]
pub struct FocalLoss {
    /// Focusing parameter. Higher values increase focus on hard examples.
    pub gamma: f32,
}

impl FocalLoss {
    /// Create a new focal loss.
    pub fn new(gamma: f32) -> Self {
        Self { gamma }
    }
}

impl Default for FocalLoss {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl<B: Backend> ClassificationCriterion<B> for FocalLoss {
    fn name(&self) -> &'static str {
        "FocalLoss"
    }

    fn forward(&self, logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
        let [batch, _] = logits.dims();
        let log_pt = log_softmax(logits, 1)
            .gather(1, targets.reshape([batch, 1]))
            .reshape([batch]);
        let weight = log_pt
            .clone()
            .exp()
            .neg()
            .add_scalar(1.0)
            .powf_scalar(self.gamma);
        (weight * log_pt).neg().mean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    fn scalar(t: Tensor<TestBackend, 1>) -> f32 {
        t.into_scalar().elem::<f32>()
    }

    fn pair(device: &<TestBackend as Backend>::Device) -> (Tensor<TestBackend, 3>, Tensor<TestBackend, 3>) {
        let preds = Tensor::<TestBackend, 1>::from_floats([0.0, 1.0, 4.0, -2.0], device)
            .reshape([1, 2, 2]);
        let targets = Tensor::<TestBackend, 3>::zeros([1, 2, 2], device);
        (preds, targets)
    }

    #[test]
    fn test_regression_losses() {
        let device = Default::default();
        let (p, t) = pair(&device);
        assert!((scalar(MSELoss.forward(p.clone(), t.clone())) - 21.0 / 4.0).abs() < 1e-6);
        assert!((scalar(L1Loss.forward(p.clone(), t.clone())) - 7.0 / 4.0).abs() < 1e-6);

        // 0, 0.5, 3.5, 1.5
        let huber = scalar(HuberLoss::new(1.0).forward(p, t));
        assert!((huber - 5.5 / 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_focal_reduces_to_cross_entropy() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats([[2.0, 0.5, -1.0], [0.1, 0.2, 3.0]], &device);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 2], &device);

        let ce = scalar(CrossEntropyLoss::default().forward(logits.clone(), targets.clone()));
        let focal0 = scalar(FocalLoss::new(0.0).forward(logits.clone(), targets.clone()));
        let focal2 = scalar(FocalLoss::new(2.0).forward(logits, targets));

        assert!((ce - focal0).abs() < 1e-5);
        assert!(focal2 < ce);
        assert!(focal2 > 0.0);
    }
}
