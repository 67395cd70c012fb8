//! Epoch loop shared by the estimators.

use std::time::Instant;

use burn::module::AutodiffModule;
use burn::optim::GradientsParams;
use burn::prelude::*;
use burn::tensor::backend::AutodiffBackend;

use crate::error::Result;
use crate::registry::ConfiguredOptimizer;
use tsforge_data::{Collate, WindowDataset, WindowLoader};

/// Training output with per-epoch losses and the final model.
#[derive(Debug)]
pub struct TrainingOutput<M> {
    /// Trained model.
    pub model: M,
    /// Batch-averaged training loss per epoch.
    pub epoch_losses: Vec<f32>,
    /// Total training time in seconds.
    pub training_time_secs: f64,
}

/// Runs a fixed number of epochs over a loader.
///
/// There is no validation split and no early stopping: every configured epoch
/// runs.
pub struct Trainer<B: AutodiffBackend> {
    device: B::Device,
    num_epochs: usize,
    verbose: bool,
}

impl<B: AutodiffBackend> Trainer<B> {
    /// Create a new trainer.
    pub fn new(device: B::Device, num_epochs: usize, verbose: bool) -> Self {
        Self {
            device,
            num_epochs,
            verbose,
        }
    }

    /// Train `model` for every epoch.
    ///
    /// `loss_fn` maps the model and one collated batch to a scalar loss.
    pub fn fit_with_loss<M, D, F>(
        &self,
        model: M,
        optim: &mut ConfiguredOptimizer<M, B>,
        loader: &mut WindowLoader<D>,
        loss_fn: F,
    ) -> Result<TrainingOutput<M>>
    where
        M: AutodiffModule<B>,
        D: WindowDataset,
        D::Item: Collate<B>,
        F: Fn(&M, <D::Item as Collate<B>>::Batch) -> Result<Tensor<B, 1>>,
    {
        let start_time = Instant::now();
        let mut model = model;
        let mut epoch_losses = Vec::with_capacity(self.num_epochs);

        for epoch in 0..self.num_epochs {
            let loss = self.run_epoch(epoch, &mut model, optim, loader, &loss_fn)?;
            epoch_losses.push(loss);
        }

        let training_time_secs = start_time.elapsed().as_secs_f64();
        tracing::debug!(
            "Trained {} epochs in {:.2}s",
            self.num_epochs,
            training_time_secs
        );

        Ok(TrainingOutput {
            model,
            epoch_losses,
            training_time_secs,
        })
    }

    /// One pass over the loader.
    ///
    /// Each batch runs forward, loss, backward and an optimizer step; burn
    /// computes fresh gradients on every `backward`. Returns the mean batch
    /// loss.
    pub fn run_epoch<M, D, F>(
        &self,
        epoch: usize,
        model: &mut M,
        optim: &mut ConfiguredOptimizer<M, B>,
        loader: &mut WindowLoader<D>,
        loss_fn: &F,
    ) -> Result<f32>
    where
        M: AutodiffModule<B>,
        D: WindowDataset,
        D::Item: Collate<B>,
        F: Fn(&M, <D::Item as Collate<B>>::Batch) -> Result<Tensor<B, 1>>,
    {
        let mut total_loss = 0.0f32;
        let mut n_batches = 0usize;

        for batch in loader.iter::<B>(&self.device) {
            let loss = loss_fn(&*model, batch?)?;
            total_loss += loss.clone().into_scalar().elem::<f32>();

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, model);
            *model = optim.step(model.clone(), grads);

            n_batches += 1;
        }

        let mean_loss = if n_batches == 0 {
            0.0
        } else {
            total_loss / n_batches as f32
        };
        if self.verbose {
            tracing::info!("Epoch {}: Loss: {}", epoch + 1, mean_loss);
        } else {
            tracing::debug!("Epoch {}: Loss: {}", epoch + 1, mean_loss);
        }
        Ok(mean_loss)
    }
}
