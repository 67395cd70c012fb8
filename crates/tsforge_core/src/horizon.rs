//! Forecasting horizons.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::time::{Frequency, TimePoint};

/// The steps ahead an estimator is asked to forecast.
///
/// A horizon is either relative (integer offsets from the cutoff, `1` being
/// the first step after it) or absolute (time points). Values are kept sorted
/// and unique.
///
/// ```rust
/// use tsforge_core::{ForecastingHorizon, TimePoint};
///
/// let fh = ForecastingHorizon::relative([3, 1, 2, 3]).unwrap();
/// assert_eq!(fh.offsets(), Some(&[1, 2, 3][..]));
///
/// let absolute = fh.to_absolute(&TimePoint::Int(9), None).unwrap();
/// assert_eq!(absolute, vec![TimePoint::Int(10), TimePoint::Int(11), TimePoint::Int(12)]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastingHorizon {
    values: HorizonValues,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum HorizonValues {
    Relative(Vec<i64>),
    Absolute(Vec<TimePoint>),
}

impl ForecastingHorizon {
    /// Build a relative horizon from offsets.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidHorizon`] if no offsets are given.
    pub fn relative(offsets: impl IntoIterator<Item = i64>) -> Result<Self> {
        let mut values: Vec<i64> = offsets.into_iter().collect();
        if values.is_empty() {
            return Err(CoreError::InvalidHorizon(
                "horizon must contain at least one offset".to_string(),
            ));
        }
        values.sort_unstable();
        values.dedup();
        Ok(Self {
            values: HorizonValues::Relative(values),
        })
    }

    /// The relative horizon `1..=steps`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidHorizon`] for zero steps.
    pub fn range(steps: usize) -> Result<Self> {
        let steps = i64::try_from(steps)
            .map_err(|_| CoreError::InvalidHorizon(format!("{steps} steps is too large")))?;
        Self::relative(1..=steps)
    }

    /// Build an absolute horizon from time points.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidHorizon`] if no points are given or integer
    /// and calendar points are mixed.
    pub fn absolute(points: impl IntoIterator<Item = TimePoint>) -> Result<Self> {
        let mut values: Vec<TimePoint> = points.into_iter().collect();
        let Some(first) = values.first() else {
            return Err(CoreError::InvalidHorizon(
                "horizon must contain at least one time point".to_string(),
            ));
        };
        let calendar = first.is_timestamp();
        if values.iter().any(|p| p.is_timestamp() != calendar) {
            return Err(CoreError::InvalidHorizon(
                "horizon mixes integer and timestamp values".to_string(),
            ));
        }
        values.sort_unstable();
        values.dedup();
        Ok(Self {
            values: HorizonValues::Absolute(values),
        })
    }

    /// Whether the horizon holds relative offsets.
    #[must_use]
    pub fn is_relative(&self) -> bool {
        matches!(self.values, HorizonValues::Relative(_))
    }

    /// Number of requested steps.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.values {
            HorizonValues::Relative(v) => v.len(),
            HorizonValues::Absolute(v) => v.len(),
        }
    }

    /// Always false; horizons are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The offsets of a relative horizon.
    #[must_use]
    pub fn offsets(&self) -> Option<&[i64]> {
        match &self.values {
            HorizonValues::Relative(v) => Some(v),
            HorizonValues::Absolute(_) => None,
        }
    }

    /// The largest offset of a relative horizon.
    #[must_use]
    pub fn max_offset(&self) -> Option<i64> {
        self.offsets().and_then(|v| v.last().copied())
    }

    /// Express the horizon as offsets from `cutoff`.
    ///
    /// # Errors
    ///
    /// Fails when an absolute point is off the frequency grid or a timestamp
    /// horizon has no frequency.
    pub fn to_relative(&self, cutoff: &TimePoint, freq: Option<&Frequency>) -> Result<Self> {
        match &self.values {
            HorizonValues::Relative(_) => Ok(self.clone()),
            HorizonValues::Absolute(points) => {
                let offsets = points
                    .iter()
                    .map(|p| cutoff.steps_to(p, freq))
                    .collect::<Result<Vec<_>>>()?;
                Self::relative(offsets)
            }
        }
    }

    /// Express the horizon as time points after `cutoff`.
    ///
    /// # Errors
    ///
    /// Fails when a timestamp cutoff has no frequency or an offset overflows.
    pub fn to_absolute(
        &self,
        cutoff: &TimePoint,
        freq: Option<&Frequency>,
    ) -> Result<Vec<TimePoint>> {
        match &self.values {
            HorizonValues::Relative(offsets) => {
                offsets.iter().map(|&k| cutoff.shift(k, freq)).collect()
            }
            HorizonValues::Absolute(points) => Ok(points.clone()),
        }
    }

    /// Reject zero and negative offsets.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InSampleNotSupported`] listing the offending
    /// offsets, or [`CoreError::InvalidHorizon`] for an absolute horizon.
    pub fn ensure_out_of_sample(&self) -> Result<()> {
        let offsets = self.offsets().ok_or_else(|| {
            CoreError::InvalidHorizon(
                "convert the horizon to relative offsets before checking it".to_string(),
            )
        })?;
        let in_sample: Vec<i64> = offsets.iter().copied().filter(|&k| k <= 0).collect();
        if in_sample.is_empty() {
            Ok(())
        } else {
            Err(CoreError::InSampleNotSupported(in_sample))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> TimePoint {
        TimePoint::from(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_relative_sorted_unique() {
        let fh = ForecastingHorizon::relative([4, 2, 4]).unwrap();
        assert_eq!(fh.offsets(), Some(&[2, 4][..]));
        assert_eq!(fh.max_offset(), Some(4));
        assert_eq!(fh.len(), 2);
    }

    #[test]
    fn test_empty_horizon_rejected() {
        assert!(ForecastingHorizon::relative(Vec::new()).is_err());
        assert!(ForecastingHorizon::range(0).is_err());
        assert!(ForecastingHorizon::absolute(Vec::new()).is_err());
    }

    #[test]
    fn test_calendar_round_trip() {
        let freq: Frequency = "D".parse().unwrap();
        let cutoff = date(2024, 1, 10);
        let fh = ForecastingHorizon::range(4).unwrap();
        let absolute = fh.to_absolute(&cutoff, Some(&freq)).unwrap();
        assert_eq!(absolute.first(), Some(&date(2024, 1, 11)));
        assert_eq!(absolute.last(), Some(&date(2024, 1, 14)));

        let back = ForecastingHorizon::absolute(absolute)
            .unwrap()
            .to_relative(&cutoff, Some(&freq))
            .unwrap();
        assert_eq!(back, fh);
    }

    #[test]
    fn test_in_sample_rejected() {
        let fh = ForecastingHorizon::relative([-1, 0, 1]).unwrap();
        match fh.ensure_out_of_sample() {
            Err(CoreError::InSampleNotSupported(bad)) => assert_eq!(bad, vec![-1, 0]),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(ForecastingHorizon::range(3).unwrap().ensure_out_of_sample().is_ok());
    }

    #[test]
    fn test_timestamp_needs_frequency() {
        let fh = ForecastingHorizon::range(2).unwrap();
        assert!(fh.to_absolute(&date(2024, 1, 1), None).is_err());
    }

    #[test]
    fn test_mixed_absolute_rejected() {
        assert!(ForecastingHorizon::absolute([TimePoint::Int(1), date(2024, 1, 1)]).is_err());
    }
}
