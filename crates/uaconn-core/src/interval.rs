//! Sampling interval value object.

use crate::{DomainError, DomainResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// Requested sampling rate for a group of monitored items, in milliseconds.
///
/// Always positive and finite, which makes bitwise equality a valid
/// identity: two intervals are the same key exactly when they carry the
/// same number of milliseconds. Subscriptions are grouped by this key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SamplingInterval(f64);

impl SamplingInterval {
    /// Default interval used when callers do not pick one.
    pub const DEFAULT_MILLIS: f64 = 1000.0;

    /// Creates an interval from milliseconds.
    pub fn from_millis(millis: f64) -> DomainResult<Self> {
        if !millis.is_finite() || millis <= 0.0 {
            return Err(DomainError::InvalidSamplingInterval { millis });
        }
        Ok(Self(millis))
    }

    /// Creates an interval from a duration.
    pub fn from_duration(duration: Duration) -> DomainResult<Self> {
        Self::from_millis(duration.as_secs_f64() * 1000.0)
    }

    /// Returns the interval in milliseconds.
    pub fn as_millis(self) -> f64 {
        self.0
    }

    /// Returns the interval as a duration.
    pub fn as_duration(self) -> Duration {
        Duration::from_secs_f64(self.0 / 1000.0)
    }
}

impl Default for SamplingInterval {
    fn default() -> Self {
        Self(Self::DEFAULT_MILLIS)
    }
}

impl PartialEq for SamplingInterval {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for SamplingInterval {}

impl Hash for SamplingInterval {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for SamplingInterval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SamplingInterval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl TryFrom<f64> for SamplingInterval {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::from_millis(value)
    }
}

impl From<SamplingInterval> for f64 {
    fn from(interval: SamplingInterval) -> Self {
        interval.0
    }
}

impl fmt::Display for SamplingInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_rejects_non_positive_and_non_finite() {
        for millis in [0.0, -1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(
                SamplingInterval::from_millis(millis).is_err(),
                "{millis} should be rejected"
            );
        }
    }

    #[test]
    fn test_default_is_one_second() {
        assert_eq!(SamplingInterval::default().as_millis(), 1000.0);
        assert_eq!(
            SamplingInterval::default().as_duration(),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_usable_as_map_key() {
        let mut map = HashMap::new();
        map.insert(SamplingInterval::from_millis(250.0).unwrap(), "fast");
        map.insert(SamplingInterval::from_millis(250.0).unwrap(), "fast-again");
        map.insert(SamplingInterval::from_millis(1000.0).unwrap(), "slow");
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_ordering() {
        let mut intervals = vec![
            SamplingInterval::from_millis(1000.0).unwrap(),
            SamplingInterval::from_millis(100.0).unwrap(),
            SamplingInterval::from_millis(500.5).unwrap(),
        ];
        intervals.sort();
        let millis: Vec<f64> = intervals.iter().map(|i| i.as_millis()).collect();
        assert_eq!(millis, vec![100.0, 500.5, 1000.0]);
    }

    #[test]
    fn test_from_duration() {
        let interval = SamplingInterval::from_duration(Duration::from_millis(250)).unwrap();
        assert_eq!(interval.as_millis(), 250.0);
        assert!(SamplingInterval::from_duration(Duration::ZERO).is_err());
    }
}
