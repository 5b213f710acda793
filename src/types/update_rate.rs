//! Publication rate for decoded state streams

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How often a state subscriber wants to hear about changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateRate {
    /// Every change, as fast as chunks arrive
    Every,

    /// At most this many samples per second, latest value wins
    Max(u32),
}

impl UpdateRate {
    /// `Max(0)` cannot be honoured and falls back to `Every`.
    pub fn normalize(self) -> Self {
        match self {
            UpdateRate::Max(0) => UpdateRate::Every,
            other => other,
        }
    }

    /// Sampling period, if any.
    pub fn sample_interval(self) -> Option<Duration> {
        match self.normalize() {
            UpdateRate::Every => None,
            UpdateRate::Max(hz) => Some(Duration::from_secs_f64(1.0 / f64::from(hz))),
        }
    }
}

impl Default for UpdateRate {
    fn default() -> Self {
        UpdateRate::Max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals() {
        assert_eq!(UpdateRate::Every.sample_interval(), None);
        assert_eq!(UpdateRate::Max(0).sample_interval(), None);
        assert_eq!(UpdateRate::Max(4).sample_interval(), Some(Duration::from_millis(250)));
        assert_eq!(UpdateRate::default().sample_interval(), Some(Duration::from_secs(1)));
    }
}
