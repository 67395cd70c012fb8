//! Time index values and sampling frequencies.
//!
//! A panel's time level holds either plain integers (positional / range
//! indices) or timestamps. Integer indices step by one; timestamp indices
//! step according to a [`Frequency`].

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A single value of a time index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimePoint {
    /// Integer (range-like) index value.
    Int(i64),
    /// Calendar timestamp.
    Timestamp(NaiveDateTime),
}

impl TimePoint {
    /// The integer value, if this is an integer point.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            TimePoint::Int(v) => Some(*v),
            TimePoint::Timestamp(_) => None,
        }
    }

    /// The timestamp, if this is a calendar point.
    #[must_use]
    pub const fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            TimePoint::Int(_) => None,
            TimePoint::Timestamp(ts) => Some(*ts),
        }
    }

    /// Whether this point is a calendar timestamp.
    #[must_use]
    pub const fn is_timestamp(&self) -> bool {
        matches!(self, TimePoint::Timestamp(_))
    }

    /// Move this point `steps` periods forward (or backward when negative).
    ///
    /// Integer points ignore the frequency and move by `steps`. Timestamps
    /// require one.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingFrequency`] for a timestamp without a
    /// frequency and [`CoreError::TimeOutOfRange`] on calendar overflow.
    pub fn shift(&self, steps: i64, freq: Option<&Frequency>) -> Result<TimePoint> {
        match self {
            TimePoint::Int(v) => v
                .checked_add(steps)
                .map(TimePoint::Int)
                .ok_or_else(|| CoreError::TimeOutOfRange(format!("{v} + {steps}"))),
            TimePoint::Timestamp(ts) => {
                let freq = freq.ok_or_else(|| {
                    CoreError::MissingFrequency(format!(
                        "cannot shift timestamp {ts} without a frequency"
                    ))
                })?;
                freq.offset(*ts, steps).map(TimePoint::Timestamp)
            }
        }
    }

    /// Number of periods from `self` to `other`.
    ///
    /// # Errors
    ///
    /// Fails when the kinds differ, when a timestamp has no frequency, or when
    /// `other` is not on the frequency grid anchored at `self`.
    pub fn steps_to(&self, other: &TimePoint, freq: Option<&Frequency>) -> Result<i64> {
        match (self, other) {
            (TimePoint::Int(a), TimePoint::Int(b)) => Ok(b - a),
            (TimePoint::Timestamp(a), TimePoint::Timestamp(b)) => {
                let freq = freq.ok_or_else(|| {
                    CoreError::MissingFrequency(format!(
                        "cannot measure distance from {a} to {b} without a frequency"
                    ))
                })?;
                freq.steps_between(*a, *b)
            }
            _ => Err(CoreError::IncompatibleTime(format!(
                "cannot compare {self} with {other}"
            ))),
        }
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimePoint::Int(v) => write!(f, "{v}"),
            TimePoint::Timestamp(ts) if ts.time() == NaiveTime::MIN => {
                write!(f, "{}", ts.date())
            }
            TimePoint::Timestamp(ts) => write!(f, "{ts}"),
        }
    }
}

impl From<i64> for TimePoint {
    fn from(v: i64) -> Self {
        TimePoint::Int(v)
    }
}

impl From<NaiveDateTime> for TimePoint {
    fn from(ts: NaiveDateTime) -> Self {
        TimePoint::Timestamp(ts)
    }
}

impl From<NaiveDate> for TimePoint {
    fn from(date: NaiveDate) -> Self {
        TimePoint::Timestamp(date.and_time(NaiveTime::MIN))
    }
}

/// Base unit of a [`Frequency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrequencyUnit {
    /// Seconds.
    Second,
    /// Minutes.
    Minute,
    /// Hours.
    Hour,
    /// Calendar days.
    Day,
    /// Weeks of seven days.
    Week,
    /// Calendar months.
    Month,
    /// Calendar quarters.
    Quarter,
    /// Calendar years.
    Year,
}

impl FrequencyUnit {
    /// Fixed length in seconds, `None` for calendar units.
    #[must_use]
    pub const fn fixed_seconds(&self) -> Option<i64> {
        match self {
            FrequencyUnit::Second => Some(1),
            FrequencyUnit::Minute => Some(60),
            FrequencyUnit::Hour => Some(3_600),
            FrequencyUnit::Day => Some(86_400),
            FrequencyUnit::Week => Some(604_800),
            FrequencyUnit::Month | FrequencyUnit::Quarter | FrequencyUnit::Year => None,
        }
    }

    /// Length in months, `None` for fixed units.
    #[must_use]
    pub const fn months(&self) -> Option<u32> {
        match self {
            FrequencyUnit::Month => Some(1),
            FrequencyUnit::Quarter => Some(3),
            FrequencyUnit::Year => Some(12),
            _ => None,
        }
    }

    /// Coarse frequency category used by pretrained decoders.
    ///
    /// `0` for daily and finer, `1` for weekly and monthly, `2` for quarterly
    /// and yearly data.
    #[must_use]
    pub const fn category(&self) -> i64 {
        match self {
            FrequencyUnit::Second
            | FrequencyUnit::Minute
            | FrequencyUnit::Hour
            | FrequencyUnit::Day => 0,
            FrequencyUnit::Week | FrequencyUnit::Month => 1,
            FrequencyUnit::Quarter | FrequencyUnit::Year => 2,
        }
    }
}

/// Sampling frequency of a timestamp index.
///
/// Parsed from pandas-style aliases:
///
/// | alias | meaning |
/// |-------|---------|
/// | `S` | second |
/// | `T`, `min` | minute |
/// | `H` | hour |
/// | `D` | day |
/// | `W`, `W-SUN` | week |
/// | `M`, `ME` / `MS` | month end / start |
/// | `Q`, `QE` / `QS` | quarter end / start |
/// | `Y`, `A`, `A-DEC` / `YS`, `AS` | year end / start |
///
/// A leading integer gives a multiple, e.g. `"15min"` or `"2H"`.
///
/// ```rust
/// use tsforge_core::{Frequency, FrequencyUnit};
///
/// let freq: Frequency = "15min".parse().unwrap();
/// assert_eq!(freq.unit(), FrequencyUnit::Minute);
/// assert_eq!(freq.multiple(), 15);
/// assert_eq!(freq.to_string(), "15min");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Frequency {
    unit: FrequencyUnit,
    multiple: u32,
    period_end: bool,
}

impl Frequency {
    /// A frequency of one `unit`, anchored at period start for calendar units.
    #[must_use]
    pub const fn new(unit: FrequencyUnit) -> Self {
        Self {
            unit,
            multiple: 1,
            period_end: false,
        }
    }

    /// Set the multiple of the base unit.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero multiple.
    pub fn with_multiple(mut self, multiple: u32) -> Result<Self> {
        if multiple == 0 {
            return Err(CoreError::InvalidFrequency(
                "frequency multiple must be positive".to_string(),
            ));
        }
        self.multiple = multiple;
        Ok(self)
    }

    /// Anchor calendar units at the end of their period.
    #[must_use]
    pub const fn at_period_end(mut self) -> Self {
        self.period_end = true;
        self
    }

    /// The base unit.
    #[must_use]
    pub const fn unit(&self) -> FrequencyUnit {
        self.unit
    }

    /// The multiple of the base unit.
    #[must_use]
    pub const fn multiple(&self) -> u32 {
        self.multiple
    }

    /// Whether calendar periods are anchored at their last day.
    #[must_use]
    pub const fn is_period_end(&self) -> bool {
        self.period_end && self.unit.months().is_some()
    }

    /// Move `ts` by `n` periods.
    ///
    /// Calendar units land on the first (or last, for end-anchored
    /// frequencies) day of the target month, keeping the time of day.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::TimeOutOfRange`] on overflow.
    pub fn offset(&self, ts: NaiveDateTime, n: i64) -> Result<NaiveDateTime> {
        let out_of_range = || CoreError::TimeOutOfRange(format!("{ts} shifted by {n} x {self}"));
        if let Some(secs) = self.unit.fixed_seconds() {
            let total = n
                .checked_mul(i64::from(self.multiple))
                .and_then(|k| k.checked_mul(secs))
                .ok_or_else(out_of_range)?;
            let delta = Duration::try_seconds(total).ok_or_else(out_of_range)?;
            return ts.checked_add_signed(delta).ok_or_else(out_of_range);
        }

        let step = i64::from(self.unit.months().unwrap_or(1)) * i64::from(self.multiple);
        let months = n.checked_mul(step).ok_or_else(out_of_range)?;
        let month_start = NaiveDate::from_ymd_opt(ts.year(), ts.month(), 1).ok_or_else(out_of_range)?;
        let target = shift_months(month_start, months).ok_or_else(out_of_range)?;
        let date = if self.period_end {
            shift_months(target, 1)
                .and_then(|next| next.pred_opt())
                .ok_or_else(out_of_range)?
        } else {
            target
        };
        Ok(date.and_time(ts.time()))
    }

    /// Number of periods from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::IncompatibleTime`] when `to` is not reachable from
    /// `from` by whole periods.
    pub fn steps_between(&self, from: NaiveDateTime, to: NaiveDateTime) -> Result<i64> {
        let off_grid = || {
            CoreError::IncompatibleTime(format!(
                "{to} is not a whole number of {self} periods from {from}"
            ))
        };
        let steps = if let Some(secs) = self.unit.fixed_seconds() {
            let step = secs * i64::from(self.multiple);
            let diff = (to - from).num_seconds();
            if diff % step != 0 {
                return Err(off_grid());
            }
            diff / step
        } else {
            let step = i64::from(self.unit.months().unwrap_or(1)) * i64::from(self.multiple);
            let diff = month_number(&to) - month_number(&from);
            if diff % step != 0 {
                return Err(off_grid());
            }
            diff / step
        };
        if self.offset(from, steps)? == to {
            Ok(steps)
        } else {
            Err(off_grid())
        }
    }

    /// Infer a frequency from a regular, increasing timestamp index.
    ///
    /// Returns `None` for fewer than two points or an irregular index.
    #[must_use]
    pub fn infer(points: &[NaiveDateTime]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let first = (points[1] - points[0]).num_seconds();
        if first > 0 && points.windows(2).all(|w| (w[1] - w[0]).num_seconds() == first) {
            return Some(Self::from_fixed_seconds(first));
        }

        let month_diff = month_number(&points[1]) - month_number(&points[0]);
        if month_diff <= 0 {
            return None;
        }
        let (unit, multiple) = if month_diff % 12 == 0 {
            (FrequencyUnit::Year, month_diff / 12)
        } else if month_diff % 3 == 0 {
            (FrequencyUnit::Quarter, month_diff / 3)
        } else {
            (FrequencyUnit::Month, month_diff)
        };
        let mut candidate = Self::new(unit).with_multiple(u32::try_from(multiple).ok()?).ok()?;
        if points[0].day() != 1 {
            candidate = candidate.at_period_end();
        }
        let regular = points
            .windows(2)
            .all(|w| candidate.offset(w[0], 1).is_ok_and(|next| next == w[1]));
        regular.then_some(candidate)
    }

    fn from_fixed_seconds(secs: i64) -> Self {
        let units = [
            FrequencyUnit::Week,
            FrequencyUnit::Day,
            FrequencyUnit::Hour,
            FrequencyUnit::Minute,
        ];
        for unit in units {
            let size = unit.fixed_seconds().unwrap_or(1);
            if secs % size == 0 {
                if let Ok(multiple) = u32::try_from(secs / size) {
                    return Self {
                        unit,
                        multiple,
                        period_end: false,
                    };
                }
            }
        }
        Self {
            unit: FrequencyUnit::Second,
            multiple: u32::try_from(secs).unwrap_or(u32::MAX),
            period_end: false,
        }
    }
}

fn month_number(ts: &NaiveDateTime) -> i64 {
    i64::from(ts.year()) * 12 + i64::from(ts.month0())
}

fn shift_months(date: NaiveDate, months: i64) -> Option<NaiveDate> {
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        date.checked_add_months(magnitude)
    } else {
        date.checked_sub_months(magnitude)
    }
}

impl FromStr for Frequency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, code) = trimmed.split_at(split);
        let multiple = if digits.is_empty() {
            1
        } else {
            digits
                .parse::<u32>()
                .map_err(|_| CoreError::InvalidFrequency(s.to_string()))?
        };

        let freq = match code {
            "S" | "s" => Self::new(FrequencyUnit::Second),
            "T" | "min" => Self::new(FrequencyUnit::Minute),
            "H" | "h" => Self::new(FrequencyUnit::Hour),
            "D" => Self::new(FrequencyUnit::Day),
            "W" | "W-SUN" => Self::new(FrequencyUnit::Week),
            "M" | "ME" => Self::new(FrequencyUnit::Month).at_period_end(),
            "MS" => Self::new(FrequencyUnit::Month),
            "Q" | "QE" | "Q-DEC" | "QE-DEC" => Self::new(FrequencyUnit::Quarter).at_period_end(),
            "QS" | "QS-JAN" => Self::new(FrequencyUnit::Quarter),
            "Y" | "YE" | "A" | "A-DEC" | "Y-DEC" | "YE-DEC" => {
                Self::new(FrequencyUnit::Year).at_period_end()
            }
            "YS" | "AS" | "YS-JAN" | "AS-JAN" => Self::new(FrequencyUnit::Year),
            _ => return Err(CoreError::InvalidFrequency(s.to_string())),
        };
        freq.with_multiple(multiple)
            .map_err(|_| CoreError::InvalidFrequency(s.to_string()))
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.multiple != 1 {
            write!(f, "{}", self.multiple)?;
        }
        let code = match (self.unit, self.is_period_end()) {
            (FrequencyUnit::Second, _) => "S",
            (FrequencyUnit::Minute, _) => "min",
            (FrequencyUnit::Hour, _) => "H",
            (FrequencyUnit::Day, _) => "D",
            (FrequencyUnit::Week, _) => "W",
            (FrequencyUnit::Month, true) => "M",
            (FrequencyUnit::Month, false) => "MS",
            (FrequencyUnit::Quarter, true) => "Q",
            (FrequencyUnit::Quarter, false) => "QS",
            (FrequencyUnit::Year, true) => "Y",
            (FrequencyUnit::Year, false) => "YS",
        };
        f.write_str(code)
    }
}

impl TryFrom<String> for Frequency {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Frequency> for String {
    fn from(freq: Frequency) -> Self {
        freq.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    #[test]
    fn test_parse_aliases() {
        let cases = [
            ("D", FrequencyUnit::Day, 1, false),
            ("2H", FrequencyUnit::Hour, 2, false),
            ("15min", FrequencyUnit::Minute, 15, false),
            ("T", FrequencyUnit::Minute, 1, false),
            ("M", FrequencyUnit::Month, 1, true),
            ("MS", FrequencyUnit::Month, 1, false),
            ("QS", FrequencyUnit::Quarter, 1, false),
            ("A-DEC", FrequencyUnit::Year, 1, true),
            ("AS", FrequencyUnit::Year, 1, false),
        ];
        for (alias, unit, multiple, end) in cases {
            let freq: Frequency = alias.parse().unwrap();
            assert_eq!(freq.unit(), unit, "{alias}");
            assert_eq!(freq.multiple(), multiple, "{alias}");
            assert_eq!(freq.is_period_end(), end, "{alias}");
        }
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!("X".parse::<Frequency>().is_err());
        assert!("0D".parse::<Frequency>().is_err());
        assert!("".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_daily_offset() {
        let freq: Frequency = "D".parse().unwrap();
        assert_eq!(freq.offset(day(2024, 1, 10), 1).unwrap(), day(2024, 1, 11));
        assert_eq!(freq.offset(day(2024, 2, 28), 2).unwrap(), day(2024, 3, 1));
        assert_eq!(freq.offset(day(2024, 1, 10), -10).unwrap(), day(2023, 12, 31));
    }

    #[test]
    fn test_month_end_offset() {
        let freq: Frequency = "M".parse().unwrap();
        assert_eq!(freq.offset(day(2024, 1, 31), 1).unwrap(), day(2024, 2, 29));
        assert_eq!(freq.offset(day(2024, 1, 31), 3).unwrap(), day(2024, 4, 30));
    }

    #[test]
    fn test_month_start_and_year_offset() {
        let ms: Frequency = "MS".parse().unwrap();
        assert_eq!(ms.offset(day(2024, 11, 1), 3).unwrap(), day(2025, 2, 1));
        let ys: Frequency = "YS".parse().unwrap();
        assert_eq!(ys.offset(day(2020, 1, 1), 2).unwrap(), day(2022, 1, 1));
    }

    #[test]
    fn test_steps_between() {
        let freq: Frequency = "D".parse().unwrap();
        assert_eq!(freq.steps_between(day(2024, 1, 10), day(2024, 1, 14)).unwrap(), 4);
        let q: Frequency = "Q".parse().unwrap();
        assert_eq!(q.steps_between(day(2023, 12, 31), day(2024, 6, 30)).unwrap(), 2);
        let h: Frequency = "2H".parse().unwrap();
        assert!(h
            .steps_between(day(2024, 1, 1), day(2024, 1, 1) + Duration::hours(3))
            .is_err());
    }

    #[test]
    fn test_infer() {
        let daily: Vec<_> = (1..=5).map(|d| day(2024, 1, d)).collect();
        assert_eq!(Frequency::infer(&daily).unwrap().to_string(), "D");

        let hourly: Vec<_> = (0..4).map(|h| day(2024, 1, 1) + Duration::hours(2 * h)).collect();
        assert_eq!(Frequency::infer(&hourly).unwrap().to_string(), "2H");

        let month_end = [day(2024, 1, 31), day(2024, 2, 29), day(2024, 3, 31)];
        assert_eq!(Frequency::infer(&month_end).unwrap().to_string(), "M");

        let quarter_start = [day(2024, 1, 1), day(2024, 4, 1), day(2024, 7, 1)];
        assert_eq!(Frequency::infer(&quarter_start).unwrap().to_string(), "QS");

        let irregular = [day(2024, 1, 1), day(2024, 1, 2), day(2024, 1, 5)];
        assert!(Frequency::infer(&irregular).is_none());
    }

    #[test]
    fn test_time_point_shift() {
        assert_eq!(TimePoint::Int(10).shift(3, None).unwrap(), TimePoint::Int(13));
        let ts = TimePoint::from(NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert!(ts.shift(1, None).is_err());
        let freq: Frequency = "D".parse().unwrap();
        assert_eq!(ts.shift(1, Some(&freq)).unwrap().to_string(), "2024-01-11");
    }

    #[test]
    fn test_frequency_serde() {
        let freq: Frequency = "2H".parse().unwrap();
        let json = serde_json::to_string(&freq).unwrap();
        assert_eq!(json, "\"2H\"");
        let restored: Frequency = serde_json::from_str(&json).unwrap();
        assert_eq!(freq, restored);
    }
}
