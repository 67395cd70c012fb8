//! Typed access to JSON keyword arguments.

use serde_json::{Map, Value};

use crate::error::{Result, TrainError};

/// Keyword arguments for one registry constructor.
///
/// Every key must be listed with [`Kwargs::allow`] before use; values are read
/// with typed getters that reject wrong JSON types.
pub(crate) struct Kwargs<'a> {
    target: &'a str,
    map: &'a Map<String, Value>,
}

impl<'a> Kwargs<'a> {
    pub(crate) fn new(target: &'a str, map: &'a Map<String, Value>) -> Self {
        Self { target, map }
    }

    fn invalid(&self, reason: String) -> TrainError {
        TrainError::InvalidKwargs {
            target: self.target.to_string(),
            reason,
        }
    }

    /// Reject keys outside `accepted`.
    pub(crate) fn allow(&self, accepted: &[&str]) -> Result<()> {
        let mut unknown: Vec<&str> = self
            .map
            .keys()
            .map(String::as_str)
            .filter(|key| !accepted.contains(key))
            .collect();
        if unknown.is_empty() {
            return Ok(());
        }
        unknown.sort_unstable();
        Err(self.invalid(format!(
            "unexpected keys {:?}, accepted keys are {:?}",
            unknown, accepted
        )))
    }

    pub(crate) fn f64(&self, key: &str) -> Result<Option<f64>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| self.invalid(format!("'{}' must be a number, got {}", key, value))),
        }
    }

    pub(crate) fn f32(&self, key: &str) -> Result<Option<f32>> {
        Ok(self.f64(key)?.map(|v| v as f32))
    }

    /// A number that must be `>= 0`.
    pub(crate) fn non_negative(&self, key: &str) -> Result<Option<f64>> {
        match self.f64(key)? {
            Some(v) if !(v.is_finite() && v >= 0.0) => Err(self.invalid(format!(
                "'{}' must be a finite non-negative number, got {}",
                key, v
            ))),
            other => Ok(other),
        }
    }

    pub(crate) fn bool(&self, key: &str) -> Result<Option<bool>> {
        match self.map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_bool()
                .map(Some)
                .ok_or_else(|| self.invalid(format!("'{}' must be a boolean, got {}", key, value))),
        }
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.map.get(key).is_some_and(|v| !v.is_null())
    }
}
