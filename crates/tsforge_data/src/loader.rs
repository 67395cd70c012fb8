//! Batched iteration over window datasets.

use std::marker::PhantomData;

use burn::prelude::*;

use crate::error::{DataError, Result};
use crate::sampler::{RandomSampler, Sampler, SequentialSampler};
use crate::window::{Collate, WindowDataset};
use tsforge_core::{Seed, Split};

/// A loader that produces burn batches from a window dataset.
///
/// Training loaders shuffle by default and draw a fresh permutation every
/// time [`WindowLoader::iter`] is called, reproducibly when a seed is set.
///
/// # Example
///
/// ```rust
/// use burn_ndarray::NdArray;
/// use ndarray::Array3;
/// use tsforge_core::Seed;
/// use tsforge_data::{WindowLoader, WindowedDataset};
///
/// let panel = Array3::<f32>::zeros((2, 12, 1));
/// let dataset = WindowedDataset::new(panel.view(), 6, 3).unwrap();
/// let mut loader = WindowLoader::builder(dataset)
///     .batch_size(4)
///     .seed(Seed::new(42))
///     .build()
///     .unwrap();
///
/// let device = Default::default();
/// let batches: Vec<_> = loader.iter::<NdArray>(&device).collect();
/// assert_eq!(batches.len(), 2);
/// ```
pub struct WindowLoader<D> {
    dataset: D,
    batch_size: usize,
    drop_last: bool,
    split: Split,
    sampler: Box<dyn Sampler>,
}

impl<D: WindowDataset> WindowLoader<D> {
    /// Create a new loader builder.
    #[must_use]
    pub fn builder(dataset: D) -> WindowLoaderBuilder<D> {
        WindowLoaderBuilder::new(dataset)
    }

    /// Get the dataset.
    #[must_use]
    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    /// Get the batch size.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Get the number of batches per epoch.
    #[must_use]
    pub fn n_batches(&self) -> usize {
        let n = self.dataset.len();
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }

    /// Get the total number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    /// Check if the loader is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// Get the data split type.
    #[must_use]
    pub fn split(&self) -> Split {
        self.split
    }

    /// Iterate one epoch of batches on `device`.
    ///
    /// # Type Parameters
    ///
    /// * `B` - The Burn backend to use for tensors
    pub fn iter<B: Backend>(&mut self, device: &B::Device) -> WindowLoaderIter<'_, D, B>
    where
        D::Item: Collate<B>,
    {
        let indices = self.sampler.epoch_indices(self.dataset.len());
        WindowLoaderIter {
            n_batches: self.n_batches(),
            loader: self,
            device: device.clone(),
            indices,
            current_batch: 0,
            _backend: PhantomData,
        }
    }
}

/// Builder for [`WindowLoader`].
pub struct WindowLoaderBuilder<D> {
    dataset: D,
    batch_size: usize,
    shuffle: Option<bool>,
    drop_last: bool,
    seed: Option<Seed>,
    split: Split,
}

impl<D: WindowDataset> WindowLoaderBuilder<D> {
    /// Create a new builder.
    #[must_use]
    pub fn new(dataset: D) -> Self {
        Self {
            dataset,
            batch_size: 32,
            shuffle: None,
            drop_last: false,
            seed: None,
            split: Split::Train,
        }
    }

    /// Set the batch size.
    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enable or disable shuffling. Defaults to the split's policy.
    #[must_use]
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = Some(shuffle);
        self
    }

    /// Enable or disable dropping the last incomplete batch.
    #[must_use]
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// Set the random seed for shuffling.
    #[must_use]
    pub fn seed(mut self, seed: Seed) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the data split type.
    #[must_use]
    pub fn split(mut self, split: Split) -> Self {
        self.split = split;
        self
    }

    /// Build the loader.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero batch size or an empty dataset.
    pub fn build(self) -> Result<WindowLoader<D>> {
        if self.batch_size == 0 {
            return Err(DataError::InvalidBatchSize(
                "Batch size must be greater than 0".to_string(),
            ));
        }

        if self.dataset.is_empty() {
            return Err(DataError::EmptyDataset);
        }

        let shuffle = self
            .shuffle
            .unwrap_or_else(|| self.split.shuffles_by_default());
        let sampler: Box<dyn Sampler> = match (shuffle, self.seed) {
            (false, _) => Box::new(SequentialSampler),
            (true, Some(seed)) => Box::new(RandomSampler::new(seed)),
            (true, None) => Box::new(RandomSampler::from_entropy()),
        };

        tracing::debug!(
            split = %self.split,
            items = self.dataset.len(),
            batch_size = self.batch_size,
            shuffle,
            "Built window loader"
        );

        Ok(WindowLoader {
            dataset: self.dataset,
            batch_size: self.batch_size,
            drop_last: self.drop_last,
            split: self.split,
            sampler,
        })
    }
}

/// Iterator over one epoch of batches from a [`WindowLoader`].
pub struct WindowLoaderIter<'a, D, B: Backend> {
    loader: &'a WindowLoader<D>,
    device: B::Device,
    indices: Vec<usize>,
    current_batch: usize,
    n_batches: usize,
    _backend: PhantomData<B>,
}

impl<D, B> Iterator for WindowLoaderIter<'_, D, B>
where
    D: WindowDataset,
    D::Item: Collate<B>,
    B: Backend,
{
    type Item = Result<<D::Item as Collate<B>>::Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_batch >= self.n_batches {
            return None;
        }

        let start = self.current_batch * self.loader.batch_size;
        let end = std::cmp::min(start + self.loader.batch_size, self.indices.len());
        self.current_batch += 1;

        let items = self.indices[start..end]
            .iter()
            .map(|&idx| self.loader.dataset.get(idx))
            .collect::<Result<Vec<_>>>();
        Some(items.and_then(|items| <D::Item as Collate<B>>::collate(items, &self.device)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.n_batches - self.current_batch;
        (remaining, Some(remaining))
    }
}

impl<D, B> ExactSizeIterator for WindowLoaderIter<'_, D, B>
where
    D: WindowDataset,
    D::Item: Collate<B>,
    B: Backend,
{
}
