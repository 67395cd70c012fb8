//! Tabular panel data with an (instance..., time) row index.

use std::collections::{HashMap, HashSet};

use ndarray::{s, Array2, Array3, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};
use tsforge_core::{CoreError, Frequency, TimePoint};

/// Identifier of one instance: one value per instance index level.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceKey(Vec<String>);

impl InstanceKey {
    /// Create a key from level values.
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(values.into_iter().map(Into::into).collect())
    }

    /// The level values.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.0
    }
}

impl std::fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

impl From<&str> for InstanceKey {
    fn from(value: &str) -> Self {
        Self(vec![value.to_string()])
    }
}

/// Row index of a [`PanelFrame`].
///
/// A flat index has only a time level. A panel index has one or more instance
/// levels in front of the time level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelIndex {
    instance_names: Vec<String>,
    time_name: String,
    instances: Vec<InstanceKey>,
    times: Vec<TimePoint>,
    freq: Option<Frequency>,
}

impl PanelIndex {
    /// Names of the instance levels (empty for a flat index).
    #[must_use]
    pub fn instance_names(&self) -> &[String] {
        &self.instance_names
    }

    /// Name of the time level.
    #[must_use]
    pub fn time_name(&self) -> &str {
        &self.time_name
    }

    /// All level names, instance levels first.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names = self.instance_names.clone();
        names.push(self.time_name.clone());
        names
    }

    /// Per-row instance keys (empty for a flat index).
    #[must_use]
    pub fn instances(&self) -> &[InstanceKey] {
        &self.instances
    }

    /// Per-row time values.
    #[must_use]
    pub fn times(&self) -> &[TimePoint] {
        &self.times
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the index has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Structure of a panel, kept after fitting to rebuild forecast frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelMeta {
    /// Names of the instance levels (empty for a flat index).
    pub instance_names: Vec<String>,
    /// Name of the time level.
    pub time_name: String,
    /// Distinct instances in first-appearance order.
    pub instances: Vec<InstanceKey>,
    /// Column names.
    pub columns: Vec<String>,
    /// Frequency of the time level, if known.
    pub freq: Option<Frequency>,
}

impl PanelMeta {
    /// Whether the panel has instance levels.
    #[must_use]
    pub fn is_multi_instance(&self) -> bool {
        !self.instance_names.is_empty()
    }

    /// Number of instances (one for a flat index).
    #[must_use]
    pub fn n_instances(&self) -> usize {
        if self.is_multi_instance() {
            self.instances.len()
        } else {
            1
        }
    }
}

/// A table of `f32` values indexed by (instance..., time) rows.
///
/// # Example
///
/// ```rust
/// use ndarray::array;
/// use tsforge_core::TimePoint;
/// use tsforge_data::PanelFrame;
///
/// let y = PanelFrame::from_series(
///     (0..4).map(TimePoint::Int).collect(),
///     vec!["y".to_string()],
///     array![[1.0], [2.0], [3.0], [4.0]],
/// )
/// .unwrap();
/// assert_eq!(y.to_array3().unwrap().dim(), (1, 4, 1));
/// assert_eq!(y.cutoff().unwrap(), TimePoint::Int(3));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelFrame {
    index: PanelIndex,
    columns: Vec<String>,
    values: Array2<f32>,
}

impl PanelFrame {
    /// Create a single series with a flat time index.
    ///
    /// # Errors
    ///
    /// Returns an error if row or column counts disagree with `values`.
    pub fn from_series(
        times: Vec<TimePoint>,
        columns: Vec<String>,
        values: Array2<f32>,
    ) -> Result<Self> {
        let index = PanelIndex {
            instance_names: Vec::new(),
            time_name: "time".to_string(),
            instances: Vec::new(),
            times,
            freq: None,
        };
        Self::validated(index, columns, values)
    }

    /// Create a panel with instance levels.
    ///
    /// # Errors
    ///
    /// Returns an error if no instance level is named, if a key has the wrong
    /// number of levels, or if lengths disagree with `values`.
    pub fn from_panel(
        instance_names: Vec<String>,
        time_name: impl Into<String>,
        instances: Vec<InstanceKey>,
        times: Vec<TimePoint>,
        columns: Vec<String>,
        values: Array2<f32>,
    ) -> Result<Self> {
        if instance_names.is_empty() {
            return Err(DataError::InvalidInput(
                "a panel index needs at least one instance level".to_string(),
            ));
        }
        if instances.len() != times.len() {
            return Err(DataError::InvalidShape(format!(
                "{} instance keys for {} time values",
                instances.len(),
                times.len()
            )));
        }
        if let Some(key) = instances
            .iter()
            .find(|k| k.values().len() != instance_names.len())
        {
            return Err(DataError::InvalidInput(format!(
                "instance key {key} does not match levels {instance_names:?}"
            )));
        }
        let index = PanelIndex {
            instance_names,
            time_name: time_name.into(),
            instances,
            times,
            freq: None,
        };
        Self::validated(index, columns, values)
    }

    /// Create a panel from a dense `(instance, time, variable)` array.
    ///
    /// Instances are keyed `"0"`, `"1"`, ... under the level `"instance"`, and
    /// every instance gets the same `times`.
    ///
    /// # Errors
    ///
    /// Returns an error if `times` or `columns` disagree with the array shape.
    pub fn from_array3(
        data: ArrayView3<'_, f32>,
        times: Vec<TimePoint>,
        columns: Vec<String>,
    ) -> Result<Self> {
        let (n, t, v) = data.dim();
        if times.len() != t {
            return Err(DataError::InvalidShape(format!(
                "{} time values for {} time steps",
                times.len(),
                t
            )));
        }
        let values = data
            .as_standard_layout()
            .into_owned()
            .into_shape_with_order((n * t, v))
            .map_err(|e| DataError::InvalidShape(e.to_string()))?;
        let instances = (0..n)
            .flat_map(|i| std::iter::repeat(InstanceKey::from(i.to_string().as_str())).take(t))
            .collect();
        let all_times = (0..n).flat_map(|_| times.iter().copied()).collect();
        Self::from_panel(
            vec!["instance".to_string()],
            "time",
            instances,
            all_times,
            columns,
            values,
        )
    }

    fn validated(index: PanelIndex, columns: Vec<String>, values: Array2<f32>) -> Result<Self> {
        if values.nrows() != index.len() {
            return Err(DataError::InvalidShape(format!(
                "{} rows of values for {} index entries",
                values.nrows(),
                index.len()
            )));
        }
        if values.ncols() != columns.len() {
            return Err(DataError::InvalidShape(format!(
                "{} value columns for {} column names",
                values.ncols(),
                columns.len()
            )));
        }
        Ok(Self {
            index,
            columns,
            values,
        })
    }

    /// Set an explicit frequency for the time level.
    #[must_use]
    pub fn with_freq(mut self, freq: Frequency) -> Self {
        self.index.freq = Some(freq);
        self
    }

    /// Rename the index levels.
    ///
    /// # Errors
    ///
    /// Returns an error if the number of instance names changes.
    pub fn with_index_names(
        mut self,
        instance_names: Vec<String>,
        time_name: impl Into<String>,
    ) -> Result<Self> {
        if instance_names.len() != self.index.instance_names.len() {
            return Err(DataError::InvalidInput(format!(
                "expected {} instance level names, got {}",
                self.index.instance_names.len(),
                instance_names.len()
            )));
        }
        self.index.instance_names = instance_names;
        self.index.time_name = time_name.into();
        Ok(self)
    }

    /// The row index.
    #[must_use]
    pub fn index(&self) -> &PanelIndex {
        &self.index
    }

    /// Column names.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// The value table `(rows, columns)`.
    #[must_use]
    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    /// Number of rows.
    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    /// Whether the index has instance levels.
    #[must_use]
    pub fn is_multi_instance(&self) -> bool {
        !self.index.instance_names.is_empty()
    }

    /// Distinct instances in first-appearance order.
    #[must_use]
    pub fn instance_keys(&self) -> Vec<InstanceKey> {
        let mut seen = HashSet::new();
        self.index
            .instances
            .iter()
            .filter(|key| seen.insert(*key))
            .cloned()
            .collect()
    }

    fn instance_rows(&self) -> Vec<Vec<usize>> {
        if !self.is_multi_instance() {
            return vec![(0..self.n_rows()).collect()];
        }
        let mut position: HashMap<&InstanceKey, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for (row, key) in self.index.instances.iter().enumerate() {
            let slot = *position.entry(key).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(row);
        }
        for rows in &mut groups {
            rows.sort_by_key(|&r| self.index.times[r]);
        }
        groups
    }

    /// The time values shared by all instances, in increasing order.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::IndexMismatch`] when instances have different
    /// or repeated time values and [`DataError::EmptyDataset`] for an empty
    /// frame.
    pub fn shared_times(&self) -> Result<Vec<TimePoint>> {
        let groups = self.instance_rows();
        let first = groups.first().ok_or(DataError::EmptyDataset)?;
        let reference: Vec<TimePoint> = first.iter().map(|&r| self.index.times[r]).collect();
        if reference.is_empty() {
            return Err(DataError::EmptyDataset);
        }
        if let Some(pair) = reference.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(DataError::IndexMismatch(format!(
                "time value {} appears more than once in a series",
                pair[0]
            )));
        }
        let keys = self.instance_keys();
        for (i, rows) in groups.iter().enumerate().skip(1) {
            let same = rows.len() == reference.len()
                && rows
                    .iter()
                    .zip(&reference)
                    .all(|(&r, t)| self.index.times[r] == *t);
            if !same {
                return Err(DataError::IndexMismatch(format!(
                    "all series must have the same time index, instance {} differs from {}",
                    keys[i], keys[0]
                )));
            }
        }
        Ok(reference)
    }

    /// Dense `(instance, time, variable)` array.
    ///
    /// A flat frame becomes a single instance. Instances are stacked in
    /// first-appearance order; rows are placed in time order whatever their
    /// order in the frame.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::IndexMismatch`] for ragged panels.
    pub fn to_array3(&self) -> Result<Array3<f32>> {
        let length = self.shared_times()?.len();
        let groups = self.instance_rows();
        let mut out = Array3::<f32>::zeros((groups.len(), length, self.columns.len()));
        for (i, rows) in groups.iter().enumerate() {
            for (t, &row) in rows.iter().enumerate() {
                out.slice_mut(s![i, t, ..]).assign(&self.values.row(row));
            }
        }
        Ok(out)
    }

    /// Dense `(instance, variable, time)` array, the classification layout.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::IndexMismatch`] for ragged panels.
    pub fn to_classification_array(&self) -> Result<Array3<f32>> {
        let panel = self.to_array3()?;
        Ok(panel.permuted_axes([0, 2, 1]).as_standard_layout().into_owned())
    }

    /// The last time value, the point forecasts are made from.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::EmptyDataset`] for an empty frame.
    pub fn cutoff(&self) -> Result<TimePoint> {
        self.index
            .times
            .iter()
            .max()
            .copied()
            .ok_or(DataError::EmptyDataset)
    }

    /// Explicit frequency, or one inferred from a regular timestamp index.
    #[must_use]
    pub fn freq(&self) -> Option<Frequency> {
        if self.index.freq.is_some() {
            return self.index.freq;
        }
        let times = self.shared_times().ok()?;
        let stamps: Option<Vec<_>> = times.iter().map(TimePoint::as_timestamp).collect();
        Frequency::infer(&stamps?)
    }

    /// The frequency needed to step the time index.
    ///
    /// Integer indices step by one and need none; calendar indices must have
    /// an explicit or inferable frequency.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingFrequency`] for a calendar index whose
    /// frequency is neither set nor inferable.
    pub fn require_freq(&self) -> Result<Option<Frequency>> {
        let freq = self.freq();
        let calendar = self.index.times.first().is_some_and(TimePoint::is_timestamp);
        if calendar && freq.is_none() {
            return Err(CoreError::MissingFrequency(format!(
                "set one with with_freq, the {} index is irregular",
                self.index.time_name
            ))
            .into());
        }
        Ok(freq)
    }

    /// Keep only the named columns, in the given order.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::MissingExogenous`] listing absent columns.
    pub fn select_columns(&self, names: &[String]) -> Result<PanelFrame> {
        let mut positions = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.columns.iter().position(|c| c == name) {
                Some(pos) => positions.push(pos),
                None => missing.push(name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(DataError::MissingExogenous { missing });
        }
        Ok(Self {
            index: self.index.clone(),
            columns: names.to_vec(),
            values: self.values.select(Axis(1), &positions),
        })
    }

    /// Split rows into those at or before `cutoff` and those after it.
    #[must_use]
    pub fn split_at(&self, cutoff: &TimePoint) -> (PanelFrame, PanelFrame) {
        let (before, after): (Vec<usize>, Vec<usize>) =
            (0..self.n_rows()).partition(|&r| self.index.times[r] <= *cutoff);
        (self.take_rows(&before), self.take_rows(&after))
    }

    fn take_rows(&self, rows: &[usize]) -> PanelFrame {
        let instances = if self.is_multi_instance() {
            rows.iter().map(|&r| self.index.instances[r].clone()).collect()
        } else {
            Vec::new()
        };
        Self {
            index: PanelIndex {
                instance_names: self.index.instance_names.clone(),
                time_name: self.index.time_name.clone(),
                instances,
                times: rows.iter().map(|&r| self.index.times[r]).collect(),
                freq: self.index.freq,
            },
            columns: self.columns.clone(),
            values: self.values.select(Axis(0), rows),
        }
    }

    /// Wrap a flat frame as a one-instance panel.
    ///
    /// Frames that already have instance levels are returned unchanged.
    #[must_use]
    pub fn to_multiindex(&self, level_name: &str, instance: &str) -> PanelFrame {
        if self.is_multi_instance() {
            return self.clone();
        }
        let mut out = self.clone();
        out.index.instance_names = vec![level_name.to_string()];
        out.index.instances = vec![InstanceKey::from(instance); self.n_rows()];
        out
    }

    /// Structure needed to rebuild frames shaped like this one.
    #[must_use]
    pub fn meta(&self) -> PanelMeta {
        PanelMeta {
            instance_names: self.index.instance_names.clone(),
            time_name: self.index.time_name.clone(),
            instances: self.instance_keys(),
            columns: self.columns.clone(),
            freq: self.freq(),
        }
    }

    /// Build a frame from a meta description and explicit rows.
    pub(crate) fn from_meta(
        meta: &PanelMeta,
        instances: Vec<InstanceKey>,
        times: Vec<TimePoint>,
        values: Array2<f32>,
    ) -> Result<Self> {
        let index = PanelIndex {
            instance_names: meta.instance_names.clone(),
            time_name: meta.time_name.clone(),
            instances,
            times,
            freq: meta.freq,
        };
        Self::validated(index, meta.columns.clone(), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ndarray::array;

    fn day(d: u32) -> TimePoint {
        TimePoint::from(NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
    }

    fn two_instance_panel() -> PanelFrame {
        // Rows deliberately interleaved: instance "b" appears first.
        PanelFrame::from_panel(
            vec!["store".to_string()],
            "date",
            vec!["b".into(), "a".into(), "b".into(), "a".into()],
            vec![day(1), day(1), day(2), day(2)],
            vec!["sales".to_string()],
            array![[10.0], [1.0], [20.0], [2.0]],
        )
        .unwrap()
    }

    #[test]
    fn test_first_appearance_order() {
        let panel = two_instance_panel();
        assert_eq!(
            panel.instance_keys(),
            vec![InstanceKey::from("b"), InstanceKey::from("a")]
        );

        let arr = panel.to_array3().unwrap();
        assert_eq!(arr.dim(), (2, 2, 1));
        assert_eq!(arr[[0, 1, 0]], 20.0);
        assert_eq!(arr[[1, 0, 0]], 1.0);
    }

    #[test]
    fn test_ragged_panel_fails_fast() {
        let panel = PanelFrame::from_panel(
            vec!["id".to_string()],
            "t",
            vec!["a".into(), "a".into(), "b".into()],
            vec![TimePoint::Int(0), TimePoint::Int(1), TimePoint::Int(0)],
            vec!["y".to_string()],
            array![[1.0], [2.0], [3.0]],
        )
        .unwrap();
        assert!(matches!(panel.to_array3(), Err(DataError::IndexMismatch(_))));
    }

    #[test]
    fn test_rows_ordered_by_time() {
        let newest_first = PanelFrame::from_series(
            vec![TimePoint::Int(3), TimePoint::Int(2), TimePoint::Int(1), TimePoint::Int(0)],
            vec!["y".to_string()],
            array![[40.0], [30.0], [20.0], [10.0]],
        )
        .unwrap();
        let arr = newest_first.to_array3().unwrap();
        assert_eq!(
            arr.iter().copied().collect::<Vec<_>>(),
            vec![10.0, 20.0, 30.0, 40.0]
        );
        assert_eq!(newest_first.cutoff().unwrap(), TimePoint::Int(3));
        assert_eq!(
            newest_first.shared_times().unwrap(),
            (0..4).map(TimePoint::Int).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_duplicate_times_rejected() {
        let panel = PanelFrame::from_panel(
            vec!["id".to_string()],
            "t",
            vec!["a".into(), "a".into(), "a".into()],
            vec![TimePoint::Int(0), TimePoint::Int(1), TimePoint::Int(1)],
            vec!["y".to_string()],
            array![[1.0], [2.0], [3.0]],
        )
        .unwrap();
        assert!(matches!(panel.to_array3(), Err(DataError::IndexMismatch(_))));
    }

    #[test]
    fn test_shape_validation() {
        let result = PanelFrame::from_series(
            vec![TimePoint::Int(0)],
            vec!["a".to_string(), "b".to_string()],
            array![[1.0]],
        );
        assert!(matches!(result, Err(DataError::InvalidShape(_))));
    }

    #[test]
    fn test_inferred_freq_and_cutoff() {
        let panel = two_instance_panel();
        assert_eq!(panel.freq().map(|f| f.to_string()), Some("D".to_string()));
        assert_eq!(panel.cutoff().unwrap(), day(2));
    }

    #[test]
    fn test_calendar_index_requires_freq() {
        let irregular = PanelFrame::from_series(
            vec![day(1), day(2), day(5)],
            vec!["y".to_string()],
            array![[1.0], [2.0], [3.0]],
        )
        .unwrap();
        assert!(matches!(
            irregular.require_freq(),
            Err(DataError::CoreError(CoreError::MissingFrequency(_)))
        ));

        let explicit = irregular.with_freq("D".parse().unwrap());
        assert!(explicit.require_freq().unwrap().is_some());

        let integer = PanelFrame::from_series(
            vec![TimePoint::Int(0), TimePoint::Int(3)],
            vec!["y".to_string()],
            array![[1.0], [2.0]],
        )
        .unwrap();
        assert_eq!(integer.require_freq().unwrap(), None);
    }

    #[test]
    fn test_select_columns_reports_missing() {
        let panel = two_instance_panel();
        let err = panel
            .select_columns(&["price".to_string(), "sales".to_string()])
            .unwrap_err();
        match err {
            DataError::MissingExogenous { missing } => assert_eq!(missing, vec!["price"]),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_split_at() {
        let panel = two_instance_panel();
        let (train, test) = panel.split_at(&day(1));
        assert_eq!(train.n_rows(), 2);
        assert_eq!(test.n_rows(), 2);
        assert_eq!(test.cutoff().unwrap(), day(2));
    }

    #[test]
    fn test_from_array3_and_classification_layout() {
        let data = Array3::from_shape_fn((2, 3, 2), |(i, t, v)| (i * 100 + t * 10 + v) as f32);
        let panel = PanelFrame::from_array3(
            data.view(),
            (0..3).map(TimePoint::Int).collect(),
            vec!["x0".to_string(), "x1".to_string()],
        )
        .unwrap();
        assert_eq!(panel.to_array3().unwrap(), data);

        let cls = panel.to_classification_array().unwrap();
        assert_eq!(cls.dim(), (2, 2, 3));
        assert_eq!(cls[[1, 1, 2]], data[[1, 2, 1]]);
    }

    #[test]
    fn test_to_multiindex() {
        let flat = PanelFrame::from_series(
            (0..3).map(TimePoint::Int).collect(),
            vec!["y".to_string()],
            array![[1.0], [2.0], [3.0]],
        )
        .unwrap();
        let wrapped = flat.to_multiindex("h0", "h0_0");
        assert!(wrapped.is_multi_instance());
        assert_eq!(wrapped.index().names(), vec!["h0", "time"]);
        assert_eq!(wrapped.to_array3().unwrap(), flat.to_array3().unwrap());
    }
}
