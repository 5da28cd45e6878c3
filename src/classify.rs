//! Severity Classification
//!
//! Maps a sampled metric value to an ordered severity level via monotonic
//! thresholds. Classification is a pure function of the raw value; each tick
//! is classified independently, with no hysteresis across calls.

use crate::error::{Result, VigilError};
use serde::Deserialize;

/// Ordered severity levels for a classified sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Metric is within normal bounds
    Normal,
    /// A condition is building; log only
    Warn,
    /// Containment tier: non-critical workloads may be halted
    Alert,
    /// Drastic tier: kill processes or restart a dependent service
    Critical,
}

impl Severity {
    /// Get severity string
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Warn => "warn",
            Severity::Alert => "alert",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Declarative threshold boundaries as they appear in configuration
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Thresholds {
    /// Inclusive lower bound for Warn
    pub warn: f64,
    /// Inclusive lower bound for Alert
    pub alert: f64,
    /// Inclusive lower bound for Critical
    pub critical: f64,
}

/// Validated, ordered set of (severity, inclusive lower bound) pairs
///
/// Boundaries are strictly increasing; a value below the first boundary
/// classifies as Normal.
#[derive(Debug, Clone)]
pub struct ThresholdSet {
    bounds: Vec<(Severity, f64)>,
}

impl ThresholdSet {
    /// Build a threshold set, rejecting non-finite or non-increasing boundaries
    pub fn new(thresholds: Thresholds) -> Result<Self> {
        let bounds = vec![
            (Severity::Warn, thresholds.warn),
            (Severity::Alert, thresholds.alert),
            (Severity::Critical, thresholds.critical),
        ];

        for (severity, bound) in &bounds {
            if !bound.is_finite() {
                return Err(VigilError::InvalidThresholds(format!(
                    "{severity} boundary is not a finite number"
                )));
            }
        }

        for pair in bounds.windows(2) {
            let (lo_sev, lo) = pair[0];
            let (hi_sev, hi) = pair[1];
            if hi <= lo {
                return Err(VigilError::InvalidThresholds(format!(
                    "{hi_sev} boundary {hi} must be strictly greater than {lo_sev} boundary {lo}"
                )));
            }
        }

        Ok(Self { bounds })
    }

    /// Classify a value against the thresholds
    ///
    /// Scans from the highest boundary down and returns the first severity
    /// whose boundary the value meets or exceeds, else Normal. Boundaries
    /// are inclusive lower bounds for their severity.
    pub fn classify(&self, value: f64) -> Severity {
        for (severity, bound) in self.bounds.iter().rev() {
            if value >= *bound {
                return *severity;
            }
        }
        Severity::Normal
    }

    /// Boundary for a given severity, if one is defined
    pub fn boundary(&self, severity: Severity) -> Option<f64> {
        self.bounds
            .iter()
            .find(|(s, _)| *s == severity)
            .map(|(_, b)| *b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lag_thresholds() -> ThresholdSet {
        ThresholdSet::new(Thresholds {
            warn: 30.0,
            alert: 60.0,
            critical: 120.0,
        })
        .unwrap()
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Normal < Severity::Warn);
        assert!(Severity::Warn < Severity::Alert);
        assert!(Severity::Alert < Severity::Critical);
    }

    #[test]
    fn test_classify_tiers() {
        let set = lag_thresholds();
        assert_eq!(set.classify(15.0), Severity::Normal);
        assert_eq!(set.classify(45.0), Severity::Warn);
        assert_eq!(set.classify(90.0), Severity::Alert);
        assert_eq!(set.classify(500.0), Severity::Critical);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let set = lag_thresholds();
        assert_eq!(set.classify(29.999), Severity::Normal);
        assert_eq!(set.classify(30.0), Severity::Warn);
        assert_eq!(set.classify(60.0), Severity::Alert);
        assert_eq!(set.classify(120.0), Severity::Critical);
    }

    #[test]
    fn test_classify_is_monotonic() {
        let set = lag_thresholds();
        let values = [
            -10.0, 0.0, 29.9, 30.0, 30.1, 59.9, 60.0, 61.0, 119.9, 120.0, 1e9,
        ];
        for pair in values.windows(2) {
            assert!(
                set.classify(pair[0]) <= set.classify(pair[1]),
                "classification not monotonic between {} and {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_rejects_non_increasing_boundaries() {
        let err = ThresholdSet::new(Thresholds {
            warn: 80.0,
            alert: 80.0,
            critical: 95.0,
        });
        assert!(err.is_err());

        let err = ThresholdSet::new(Thresholds {
            warn: 90.0,
            alert: 80.0,
            critical: 95.0,
        });
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_non_finite_boundaries() {
        assert!(ThresholdSet::new(Thresholds {
            warn: f64::NAN,
            alert: 80.0,
            critical: 95.0,
        })
        .is_err());
    }

    #[test]
    fn test_memory_scenario_critical() {
        let set = ThresholdSet::new(Thresholds {
            warn: 80.0,
            alert: 90.0,
            critical: 95.0,
        })
        .unwrap();
        assert_eq!(set.classify(96.0), Severity::Critical);
    }
}
