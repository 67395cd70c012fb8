//! Data split types for fitting and prediction.

use serde::{Deserialize, Serialize};

/// Which phase a loader serves.
///
/// Training loaders shuffle windows by default; prediction loaders always keep
/// dataset order so outputs line up with instance order.
///
/// ```rust
/// use tsforge_core::Split;
///
/// assert!(Split::Train.shuffles_by_default());
/// assert!(!Split::Predict.shuffles_by_default());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Split {
    /// Windows with targets, used to fit a network.
    #[default]
    Train,
    /// Trailing windows without targets, used for inference.
    Predict,
}

impl Split {
    /// Check if this is the training split.
    #[must_use]
    pub const fn is_train(&self) -> bool {
        matches!(self, Split::Train)
    }

    /// Check if this is the prediction split.
    #[must_use]
    pub const fn is_predict(&self) -> bool {
        matches!(self, Split::Predict)
    }

    /// Whether loaders for this split shuffle unless told otherwise.
    #[must_use]
    pub const fn shuffles_by_default(&self) -> bool {
        self.is_train()
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Predict => write!(f, "predict"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_checks() {
        assert!(Split::Train.is_train());
        assert!(!Split::Train.is_predict());
        assert!(Split::Predict.is_predict());
        assert_eq!(Split::default(), Split::Train);
    }

    #[test]
    fn test_split_display() {
        assert_eq!(Split::Train.to_string(), "train");
        assert_eq!(Split::Predict.to_string(), "predict");
    }
}
