//! Rebuilding forecast frames from relative predictions.

use std::collections::HashSet;

use ndarray::{Array2, ArrayView3};

use crate::error::{DataError, Result};
use crate::panel::{InstanceKey, PanelFrame, PanelMeta};
use tsforge_core::{ForecastingHorizon, TimePoint};

/// Turn a `(instances, horizon_length, variables)` prediction array into a
/// frame indexed by (instance..., absolute time).
///
/// Step `k` of every instance is placed at `cutoff + k` periods. Only rows
/// whose time is in the requested horizon are kept. Index level names, column
/// names and instance order come from `meta`.
///
/// # Errors
///
/// Returns [`DataError::HorizonExceedsMaximum`] when the horizon asks for
/// steps beyond `horizon_length`, and a shape error when the prediction array
/// does not match the panel's instance or column count.
pub fn reconstruct_forecast(
    meta: &PanelMeta,
    predictions: ArrayView3<'_, f32>,
    cutoff: &TimePoint,
    fh: &ForecastingHorizon,
) -> Result<PanelFrame> {
    let (batch, horizon_length, vars) = predictions.dim();
    let freq = meta.freq.as_ref();

    let relative = fh.to_relative(cutoff, freq)?;
    let requested = relative.max_offset().unwrap_or(0);
    if requested > horizon_length as i64 {
        return Err(DataError::HorizonExceedsMaximum {
            requested,
            max: horizon_length,
        });
    }
    if batch != meta.n_instances() {
        return Err(DataError::InvalidShape(format!(
            "predictions cover {} instances, the panel has {}",
            batch,
            meta.n_instances()
        )));
    }
    if vars != meta.columns.len() {
        return Err(DataError::InvalidShape(format!(
            "predictions have {} variables for columns {:?}",
            vars, meta.columns
        )));
    }

    let inner_times = (1..=horizon_length as i64)
        .map(|k| cutoff.shift(k, freq))
        .collect::<tsforge_core::Result<Vec<_>>>()?;
    let wanted: HashSet<TimePoint> = fh.to_absolute(cutoff, freq)?.into_iter().collect();

    let keys: Vec<Option<&InstanceKey>> = if meta.is_multi_instance() {
        meta.instances.iter().map(Some).collect()
    } else {
        vec![None]
    };

    let mut instances = Vec::new();
    let mut times = Vec::new();
    let mut values = Vec::new();
    for (i, key) in keys.iter().enumerate() {
        for (k, time) in inner_times.iter().enumerate() {
            if !wanted.contains(time) {
                continue;
            }
            if let Some(key) = key {
                instances.push((*key).clone());
            }
            times.push(*time);
            values.extend(predictions.slice(ndarray::s![i, k, ..]).iter().copied());
        }
    }

    let values = Array2::from_shape_vec((times.len(), vars), values)
        .map_err(|e| DataError::InvalidShape(e.to_string()))?;
    PanelFrame::from_meta(meta, instances, times, values)
}
