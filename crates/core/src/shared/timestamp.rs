use thiserror::Error;

/// Minimum spacing (seconds) between timestamps handed to the detector.
pub const DEFAULT_TIMESTAMP_EPSILON: f64 = 0.01;

/// Producer-side filter keeping submitted timestamps strictly increasing.
///
/// A frame is admitted only if its timestamp is more than `epsilon` past the
/// last admitted one; everything else is discarded before it reaches the
/// dispatcher.
#[derive(Clone, Debug)]
pub struct TimestampGate {
    epsilon: f64,
    last_accepted: Option<f64>,
}

impl TimestampGate {
    pub fn new(epsilon: f64) -> Self {
        Self {
            epsilon: epsilon.max(0.0),
            last_accepted: None,
        }
    }

    pub fn admit(&mut self, timestamp: f64) -> bool {
        if !timestamp.is_finite() {
            return false;
        }
        match self.last_accepted {
            Some(last) if timestamp <= last + self.epsilon => false,
            _ => {
                self.last_accepted = Some(timestamp);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}

impl Default for TimestampGate {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESTAMP_EPSILON)
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("result timestamp {received} delivered after {previous}")]
pub struct OrderViolation {
    pub previous: f64,
    pub received: f64,
}

/// Consumer-side check that results arrive in non-decreasing timestamp order.
#[derive(Clone, Debug, Default)]
pub struct ResultOrderGuard {
    last_delivered: Option<f64>,
}

impl ResultOrderGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, timestamp: f64) -> Result<(), OrderViolation> {
        if let Some(previous) = self.last_delivered {
            if timestamp < previous {
                return Err(OrderViolation {
                    previous,
                    received: timestamp,
                });
            }
        }
        self.last_delivered = Some(timestamp);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.last_delivered = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_first_timestamp_is_admitted() {
        let mut gate = TimestampGate::default();
        assert!(gate.admit(0.0));
        assert_eq!(gate.last_accepted, Some(0.0));
    }

    #[rstest]
    #[case::well_past(1.5, true)]
    #[case::just_past_epsilon(1.011, true)]
    #[case::within_epsilon(1.005, false)]
    #[case::exactly_epsilon(1.01, false)]
    #[case::equal(1.0, false)]
    #[case::backwards(0.5, false)]
    fn test_admit_relative_to_last(#[case] next: f64, #[case] admitted: bool) {
        let mut gate = TimestampGate::new(0.01);
        assert!(gate.admit(1.0));
        assert_eq!(gate.admit(next), admitted);
    }

    #[test]
    fn test_rejected_timestamp_does_not_move_the_gate() {
        let mut gate = TimestampGate::new(0.01);
        gate.admit(1.0);
        gate.admit(1.005);
        assert_eq!(gate.last_accepted, Some(1.0));
        assert!(gate.admit(1.02));
    }

    #[test]
    fn test_non_finite_timestamps_rejected() {
        let mut gate = TimestampGate::default();
        assert!(!gate.admit(f64::NAN));
        assert!(!gate.admit(f64::INFINITY));
        assert_eq!(gate.last_accepted, None);
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut gate = TimestampGate::default();
        gate.admit(5.0);
        gate.reset();
        assert!(gate.admit(1.0));
    }

    #[test]
    fn test_negative_epsilon_clamped_to_zero() {
        let mut gate = TimestampGate::new(-1.0);
        assert!(gate.admit(1.0));
        assert!(!gate.admit(1.0));
        assert!(gate.admit(1.0001));
    }

    #[test]
    fn test_guard_accepts_non_decreasing_sequence() {
        let mut guard = ResultOrderGuard::new();
        for ts in [1.0, 1.0, 2.0, 3.5] {
            assert!(guard.check(ts).is_ok());
        }
    }

    #[test]
    fn test_guard_reports_regression() {
        let mut guard = ResultOrderGuard::new();
        guard.check(2.0).unwrap();
        let err = guard.check(1.0).unwrap_err();
        assert_eq!(
            err,
            OrderViolation {
                previous: 2.0,
                received: 1.0
            }
        );
        assert!(err.to_string().contains("delivered after"));
    }

    #[test]
    fn test_guard_reset_allows_new_session() {
        let mut guard = ResultOrderGuard::new();
        guard.check(10.0).unwrap();
        guard.reset();
        assert!(guard.check(0.5).is_ok());
    }
}
