//! Windowed datasets over dense panel arrays.
//!
//! A forecasting panel of shape `(instance, time, variable)` is cut into
//! fixed-length (history, future) pairs. Each instance of length `L` yields
//! `max(L - seq_len - pred_len + 1, 0)` windows, at offsets
//! `0..=L - seq_len - pred_len`. Too-short instances yield nothing; callers
//! decide whether an empty dataset is an error.

use burn::prelude::*;
use burn::tensor::{Bool, TensorData};
use ndarray::{concatenate, s, Array2, Array3, ArrayView3, Axis};

use crate::error::{DataError, Result};
use tsforge_core::{ClassificationBatch, ForecastBatch};

/// Random-access collection of training or inference items.
pub trait WindowDataset {
    /// Item produced for one index.
    type Item;

    /// Number of items.
    fn len(&self) -> usize;

    /// Whether the dataset has no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Owned item at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::IndexOutOfBounds`] past the end.
    fn get(&self, index: usize) -> Result<Self::Item>;
}

/// Stacking of items into a burn batch on one device.
pub trait Collate<B: Backend>: Sized {
    /// Batch type produced.
    type Batch;

    /// Stack `items` into a batch.
    ///
    /// # Errors
    ///
    /// Returns an error if items disagree in shape.
    fn collate(items: Vec<Self>, device: &B::Device) -> Result<Self::Batch>;
}

/// One forecasting window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowPair {
    /// History `(seq_len, vars)`.
    pub history: Array2<f32>,
    /// Exogenous block `(seq_len, exog)`; zero columns when there is none.
    pub exogenous: Array2<f32>,
    /// Future `(label_len + pred_len, vars)`, `None` at inference.
    pub future: Option<Array2<f32>>,
}

impl WindowPair {
    /// History and exogenous block concatenated along the variable axis.
    ///
    /// # Errors
    ///
    /// Returns an error if the two blocks have different row counts.
    pub fn network_input(&self) -> Result<Array2<f32>> {
        concatenate(Axis(1), &[self.history.view(), self.exogenous.view()])
            .map_err(|e| DataError::InvalidShape(e.to_string()))
    }
}

fn stack_floats<B: Backend>(
    arrays: &[Array2<f32>],
    device: &B::Device,
) -> Result<Tensor<B, 3>> {
    let (rows, cols) = arrays
        .first()
        .map(Array2::dim)
        .ok_or(DataError::EmptyDataset)?;
    let mut flat = Vec::with_capacity(arrays.len() * rows * cols);
    for array in arrays {
        if array.dim() != (rows, cols) {
            return Err(DataError::InvalidShape(format!(
                "cannot stack window of shape {:?} with {:?}",
                array.dim(),
                (rows, cols)
            )));
        }
        flat.extend(array.iter().copied());
    }
    Ok(Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([arrays.len(), rows, cols]))
}

impl<B: Backend> Collate<B> for WindowPair {
    type Batch = ForecastBatch<B>;

    fn collate(items: Vec<Self>, device: &B::Device) -> Result<ForecastBatch<B>> {
        let inputs = items
            .iter()
            .map(WindowPair::network_input)
            .collect::<Result<Vec<_>>>()?;
        let inputs = stack_floats::<B>(&inputs, device)?;

        let futures: Option<Vec<Array2<f32>>> = items.into_iter().map(|item| item.future).collect();
        match futures {
            Some(futures) => {
                let target = stack_floats::<B>(&futures, device)?;
                Ok(ForecastBatch::with_target(inputs, target)?)
            }
            None => Ok(ForecastBatch::new(inputs)),
        }
    }
}

/// Sliding (history, future) windows over a `(instance, time, variable)` panel.
///
/// # Example
///
/// ```rust
/// use ndarray::Array3;
/// use tsforge_data::{WindowDataset, WindowedDataset};
///
/// let panel = Array3::<f32>::zeros((1, 10, 1));
/// let dataset = WindowedDataset::new(panel.view(), 6, 3).unwrap();
/// assert_eq!(dataset.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct WindowedDataset<'a> {
    data: ArrayView3<'a, f32>,
    exogenous: Option<ArrayView3<'a, f32>>,
    seq_len: usize,
    pred_len: usize,
    label_len: usize,
    inference: bool,
}

impl<'a> WindowedDataset<'a> {
    /// Create a training dataset.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero `seq_len`.
    pub fn new(data: ArrayView3<'a, f32>, seq_len: usize, pred_len: usize) -> Result<Self> {
        if seq_len == 0 {
            return Err(DataError::InvalidInput("seq_len must be positive".to_string()));
        }
        let dataset = Self {
            data,
            exogenous: None,
            seq_len,
            pred_len,
            label_len: 0,
            inference: false,
        };
        tracing::debug!(
            instances = dataset.n_instances(),
            seq_len,
            pred_len,
            windows = dataset.len(),
            "Built windowed dataset"
        );
        Ok(dataset)
    }

    /// Create an inference dataset: one trailing window of `seq_len` steps per
    /// instance, ending at the series end, with no target.
    ///
    /// Instances shorter than `seq_len` contribute no window.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero `seq_len`.
    pub fn inference(data: ArrayView3<'a, f32>, seq_len: usize) -> Result<Self> {
        let length = data.dim().1;
        let start = length.saturating_sub(seq_len);
        let mut dataset = Self::new(data.slice_move(s![.., start.., ..]), seq_len, 0)?;
        dataset.inference = true;
        Ok(dataset)
    }

    /// Start the future window `label_len` steps before the history end.
    ///
    /// # Errors
    ///
    /// Returns an error if `label_len > seq_len`.
    pub fn with_label_len(mut self, label_len: usize) -> Result<Self> {
        if label_len > self.seq_len {
            return Err(DataError::InvalidInput(format!(
                "label_len {} exceeds seq_len {}",
                label_len, self.seq_len
            )));
        }
        self.label_len = label_len;
        Ok(self)
    }

    /// Attach an exogenous panel `(instance, time, exog)`.
    ///
    /// The exogenous rows paired with a window are the `seq_len` rows ending
    /// at its last forecast step. At inference the panel must already be
    /// aligned that way (see [`assemble_inference_exogenous`]).
    ///
    /// # Errors
    ///
    /// Returns [`DataError::IndexMismatch`] if instance or time counts differ
    /// from the target panel.
    pub fn with_exogenous(mut self, exogenous: ArrayView3<'a, f32>) -> Result<Self> {
        let (n, t, _) = self.data.dim();
        let (en, et, _) = exogenous.dim();
        if en != n || et != t {
            return Err(DataError::IndexMismatch(format!(
                "exogenous panel has {} instances x {} steps, expected {} x {}",
                en, et, n, t
            )));
        }
        self.exogenous = Some(exogenous);
        Ok(self)
    }

    /// History length.
    #[must_use]
    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    /// Forecast length.
    #[must_use]
    pub fn pred_len(&self) -> usize {
        self.pred_len
    }

    /// Warm-start length.
    #[must_use]
    pub fn label_len(&self) -> usize {
        self.label_len
    }

    /// Number of instances in the panel.
    #[must_use]
    pub fn n_instances(&self) -> usize {
        self.data.dim().0
    }

    /// Number of target variables.
    #[must_use]
    pub fn n_vars(&self) -> usize {
        self.data.dim().2
    }

    /// Number of exogenous columns.
    #[must_use]
    pub fn n_exog(&self) -> usize {
        self.exogenous.as_ref().map_or(0, |x| x.dim().2)
    }

    /// Windows contributed by each instance.
    #[must_use]
    pub fn windows_per_instance(&self) -> usize {
        (self.data.dim().1 + 1).saturating_sub(self.seq_len + self.pred_len)
    }
}

impl WindowDataset for WindowedDataset<'_> {
    type Item = WindowPair;

    fn len(&self) -> usize {
        self.n_instances() * self.windows_per_instance()
    }

    fn get(&self, index: usize) -> Result<WindowPair> {
        let length = self.len();
        if index >= length {
            return Err(DataError::IndexOutOfBounds { index, length });
        }
        let per_instance = self.windows_per_instance();
        let (n, offset) = (index / per_instance, index % per_instance);
        let end = offset + self.seq_len;

        let history = self.data.slice(s![n, offset..end, ..]).to_owned();
        let exogenous = match &self.exogenous {
            Some(exog) => exog
                .slice(s![n, offset + self.pred_len..end + self.pred_len, ..])
                .to_owned(),
            None => Array2::zeros((self.seq_len, 0)),
        };
        let future = (!self.inference).then(|| {
            self.data
                .slice(s![n, end - self.label_len..end + self.pred_len, ..])
                .to_owned()
        });

        Ok(WindowPair {
            history,
            exogenous,
            future,
        })
    }
}

/// Exogenous block for inference, aligned like training windows.
///
/// `in_sample` covers the fitted period `(instance, L, exog)` and `future` the
/// forecast period `(instance, F, exog)` with `F >= pred_len`. The result is
/// the `seq_len` rows ending at forecast step `pred_len`.
///
/// # Errors
///
/// Returns an error if the future block is too short, instance or column
/// counts differ, or fewer than `seq_len` rows are available.
pub fn assemble_inference_exogenous(
    in_sample: ArrayView3<'_, f32>,
    future: ArrayView3<'_, f32>,
    seq_len: usize,
    pred_len: usize,
) -> Result<Array3<f32>> {
    let (n, length, e) = in_sample.dim();
    let (fn_, f_len, fe) = future.dim();
    if fn_ != n || fe != e {
        return Err(DataError::IndexMismatch(format!(
            "future exogenous shape {:?} does not match in-sample shape {:?}",
            future.dim(),
            in_sample.dim()
        )));
    }
    if f_len < pred_len {
        return Err(DataError::InvalidShape(format!(
            "future exogenous data covers {} steps, the forecast needs {}",
            f_len, pred_len
        )));
    }
    let end = length + pred_len;
    if end < seq_len {
        return Err(DataError::InvalidShape(format!(
            "need {} exogenous steps, only {} available",
            seq_len, end
        )));
    }
    let joined = concatenate(
        Axis(1),
        &[in_sample.view(), future.slice(s![.., ..pred_len, ..])],
    )
        .map_err(|e| DataError::InvalidShape(e.to_string()))?;
    Ok(joined.slice(s![.., end - seq_len..end, ..]).to_owned())
}

/// One classification instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationItem {
    /// Values `(time, vars)`.
    pub x: Array2<f32>,
    /// Valid-position mask of length `time`.
    pub padding_mask: Vec<bool>,
    /// Class index, `None` at inference.
    pub label: Option<usize>,
}

impl<B: Backend> Collate<B> for ClassificationItem {
    type Batch = ClassificationBatch<B>;

    fn collate(items: Vec<Self>, device: &B::Device) -> Result<ClassificationBatch<B>> {
        let xs: Vec<Array2<f32>> = items.iter().map(|item| item.x.clone()).collect();
        let x = stack_floats::<B>(&xs, device)?;
        let [batch, time, _] = x.dims();

        let mask: Vec<bool> = items
            .iter()
            .flat_map(|item| item.padding_mask.iter().copied())
            .collect();
        if mask.len() != batch * time {
            return Err(DataError::InvalidShape(format!(
                "padding masks hold {} values for a ({}, {}) batch",
                mask.len(),
                batch,
                time
            )));
        }
        let padding_mask =
            Tensor::<B, 2, Bool>::from_data(TensorData::new(mask, [batch, time]), device);
        let batch_out = ClassificationBatch::new(x, padding_mask)?;

        let labels: Option<Vec<i64>> = items
            .iter()
            .map(|item| item.label.map(|l| l as i64))
            .collect();
        match labels {
            Some(labels) => {
                let target = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), device);
                Ok(batch_out.with_target(target)?)
            }
            None => Ok(batch_out),
        }
    }
}

/// Instances of a `(instance, variable, time)` array with optional labels.
///
/// Items are transposed to `(time, variable)` and carry an all-true padding
/// mask, since all instances share one length.
#[derive(Debug, Clone)]
pub struct ClassificationDataset<'a> {
    x: ArrayView3<'a, f32>,
    labels: Option<&'a [usize]>,
}

impl<'a> ClassificationDataset<'a> {
    /// Create a dataset, with labels for training or without for inference.
    ///
    /// # Errors
    ///
    /// Returns an error if the label count differs from the instance count.
    pub fn new(x: ArrayView3<'a, f32>, labels: Option<&'a [usize]>) -> Result<Self> {
        if let Some(labels) = labels {
            if labels.len() != x.dim().0 {
                return Err(DataError::InvalidShape(format!(
                    "{} labels for {} instances",
                    labels.len(),
                    x.dim().0
                )));
            }
        }
        Ok(Self { x, labels })
    }

    /// Number of variables.
    #[must_use]
    pub fn n_vars(&self) -> usize {
        self.x.dim().1
    }

    /// Series length.
    #[must_use]
    pub fn seq_len(&self) -> usize {
        self.x.dim().2
    }
}

impl WindowDataset for ClassificationDataset<'_> {
    type Item = ClassificationItem;

    fn len(&self) -> usize {
        self.x.dim().0
    }

    fn get(&self, index: usize) -> Result<ClassificationItem> {
        let length = self.len();
        if index >= length {
            return Err(DataError::IndexOutOfBounds { index, length });
        }
        let x = self.x.slice(s![index, .., ..]).t().to_owned();
        let padding_mask = vec![true; x.nrows()];
        Ok(ClassificationItem {
            x,
            padding_mask,
            label: self.labels.map(|labels| labels[index]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    fn ramp(instances: usize, length: usize, vars: usize) -> Array3<f32> {
        Array3::from_shape_fn((instances, length, vars), |(i, t, v)| {
            (i * 1000 + t * 10 + v) as f32
        })
    }

    #[test]
    fn test_window_count() {
        let data = ramp(1, 10, 1);
        let ds = WindowedDataset::new(data.view(), 6, 3).unwrap();
        assert_eq!(ds.len(), 2);

        let panel = ramp(3, 10, 2);
        let ds = WindowedDataset::new(panel.view(), 6, 3).unwrap();
        assert_eq!(ds.len(), 6);
    }

    #[test]
    fn test_too_short_series_is_empty() {
        let data = ramp(1, 5, 1);
        let ds = WindowedDataset::new(data.view(), 6, 0).unwrap();
        assert_eq!(ds.len(), 0);
        assert!(ds.is_empty());
        assert!(matches!(ds.get(0), Err(DataError::IndexOutOfBounds { .. })));
    }

    #[test]
    fn test_window_contents() {
        let data = ramp(2, 10, 1);
        let ds = WindowedDataset::new(data.view(), 6, 3).unwrap();

        // Index 3 is instance 1, offset 1.
        let pair = ds.get(3).unwrap();
        assert_eq!(pair.history.dim(), (6, 1));
        assert_eq!(pair.history[[0, 0]], 1010.0);
        assert_eq!(pair.history[[5, 0]], 1060.0);
        let future = pair.future.unwrap();
        assert_eq!(future.dim(), (3, 1));
        assert_eq!(future[[0, 0]], 1070.0);
        assert_eq!(future[[2, 0]], 1090.0);
        assert_eq!(pair.exogenous.dim(), (6, 0));
    }

    #[test]
    fn test_label_len_future() {
        let data = ramp(1, 10, 1);
        let ds = WindowedDataset::new(data.view(), 6, 3)
            .unwrap()
            .with_label_len(2)
            .unwrap();
        let future = ds.get(0).unwrap().future.unwrap();
        assert_eq!(future.dim(), (5, 1));
        assert_eq!(future[[0, 0]], 40.0);
        assert!(WindowedDataset::new(data.view(), 6, 3)
            .unwrap()
            .with_label_len(7)
            .is_err());
    }

    #[test]
    fn test_exogenous_alignment() {
        let y = ramp(1, 10, 1);
        let x = ramp(1, 10, 2).mapv(|v| -v);
        let ds = WindowedDataset::new(y.view(), 4, 2)
            .unwrap()
            .with_exogenous(x.view())
            .unwrap();
        let pair = ds.get(1).unwrap();
        assert_eq!(pair.exogenous.dim(), (4, 2));
        // Offset 1, pred_len 2: exogenous rows 3..7.
        assert_eq!(pair.exogenous[[0, 0]], -30.0);
        assert_eq!(pair.exogenous[[3, 1]], -61.0);

        let input = pair.network_input().unwrap();
        assert_eq!(input.dim(), (4, 3));
        assert_eq!(input[[0, 0]], 10.0);
        assert_eq!(input[[0, 1]], -30.0);
    }

    #[test]
    fn test_inference_trailing_window() {
        let data = ramp(1, 10, 1);
        let ds = WindowedDataset::inference(data.view(), 6).unwrap();
        assert_eq!(ds.len(), 1);
        let pair = ds.get(0).unwrap();
        assert!(pair.future.is_none());
        assert_eq!(pair.history[[0, 0]], 40.0);
        assert_eq!(pair.history[[5, 0]], 90.0);

        let short = ramp(2, 4, 1);
        assert_eq!(WindowedDataset::inference(short.view(), 6).unwrap().len(), 0);
    }

    #[test]
    fn test_assemble_inference_exogenous() {
        let in_sample = ramp(1, 10, 1);
        let future = Array3::from_shape_fn((1, 3, 1), |(_, t, _)| 100.0 + t as f32);
        let block = assemble_inference_exogenous(in_sample.view(), future.view(), 4, 2).unwrap();
        assert_eq!(block.dim(), (1, 4, 1));
        assert_eq!(block[[0, 0, 0]], 80.0);
        assert_eq!(block[[0, 3, 0]], 101.0);

        assert!(assemble_inference_exogenous(in_sample.view(), future.view(), 4, 5).is_err());
    }

    #[test]
    fn test_assemble_from_independent_borrows() {
        let in_sample = ramp(2, 6, 2);
        let block = {
            let future = Array3::<f32>::ones((2, 2, 2));
            assemble_inference_exogenous(in_sample.view(), future.view(), 3, 2).unwrap()
        };
        assert_eq!(block.dim(), (2, 3, 2));
        assert_eq!(block[[1, 2, 1]], 1.0);
    }

    #[test]
    fn test_classification_items() {
        let x = ramp(3, 2, 5);
        let labels = [0usize, 1, 0];
        let ds = ClassificationDataset::new(x.view(), Some(&labels)).unwrap();
        assert_eq!(ds.len(), 3);
        let item = ds.get(2).unwrap();
        assert_eq!(item.x.dim(), (5, 2));
        assert_eq!(item.x[[4, 1]], x[[2, 1, 4]]);
        assert_eq!(item.padding_mask, vec![true; 5]);
        assert_eq!(item.label, Some(0));
    }

    #[test]
    fn test_collate_forecast_batch() {
        let data = ramp(2, 10, 1);
        let ds = WindowedDataset::new(data.view(), 6, 3).unwrap();
        let items = (0..4).map(|i| ds.get(i).unwrap()).collect();
        let device = Default::default();
        let batch = <WindowPair as Collate<TestBackend>>::collate(items, &device).unwrap();
        assert_eq!(batch.inputs.dims(), [4, 6, 1]);
        assert_eq!(batch.target.unwrap().dims(), [4, 3, 1]);
    }

    #[test]
    fn test_collate_classification_batch() {
        let x = ramp(2, 3, 4);
        let ds = ClassificationDataset::new(x.view(), None).unwrap();
        let items = (0..2).map(|i| ds.get(i).unwrap()).collect();
        let device = Default::default();
        let batch = <ClassificationItem as Collate<TestBackend>>::collate(items, &device).unwrap();
        assert_eq!(batch.x.dims(), [2, 4, 3]);
        assert_eq!(batch.padding_mask.dims(), [2, 4]);
        assert!(batch.target.is_none());
        let all_valid = batch.padding_mask.all().into_scalar();
        assert!(all_valid);
    }
}
