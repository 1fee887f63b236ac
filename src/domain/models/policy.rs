use std::time::{Duration, Instant};

use bon::Builder;

use crate::domain::errors::{GcError, GcResult};

/// Default age, in whole hours, after which an upload counts as abandoned
pub const DEFAULT_CLEANUP_HOURS: u32 = 3;

/// Immutable settings shared by every reaper of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
pub struct CleanupPolicy {
    #[builder(default = DEFAULT_CLEANUP_HOURS)]
    pub threshold_hours: u32,

    /// Evaluate everything, remove nothing
    #[builder(default)]
    pub dry_run: bool,

    pub max_runtime: Option<Duration>,
}

impl Default for CleanupPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl CleanupPolicy {
    /// Inclusive at the boundary: an item exactly `threshold_hours` old is
    /// eligible.
    pub fn is_expired(&self, age_hours: i64) -> bool {
        age_hours >= i64::from(self.threshold_hours)
    }
}

/// Point in time after which a run stops issuing store calls
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn after(max_runtime: Option<Duration>) -> Self {
        Self(max_runtime.map(|limit| Instant::now() + limit))
    }

    pub fn check(&self, stage: &'static str) -> GcResult<()> {
        match self.0 {
            Some(at) if Instant::now() >= at => Err(GcError::DeadlineExceeded { stage }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive() {
        let policy = CleanupPolicy::builder().threshold_hours(3).build();
        assert!(!policy.is_expired(2));
        assert!(policy.is_expired(3));
        assert!(policy.is_expired(4));
        assert!(!policy.is_expired(-1));
    }

    #[test]
    fn test_zero_threshold_takes_everything_not_in_the_future() {
        let policy = CleanupPolicy::builder().threshold_hours(0).build();
        assert!(policy.is_expired(0));
        assert!(!policy.is_expired(-2));
    }

    #[test]
    fn test_defaults() {
        let policy = CleanupPolicy::default();
        assert_eq!(policy.threshold_hours, DEFAULT_CLEANUP_HOURS);
        assert!(!policy.dry_run);
        assert_eq!(policy.max_runtime, None);
    }

    #[test]
    fn test_deadline() {
        assert!(Deadline::none().check("listing").is_ok());
        assert!(Deadline::after(Some(Duration::from_secs(3600)))
            .check("listing")
            .is_ok());
        assert!(matches!(
            Deadline::after(Some(Duration::ZERO)).check("listing"),
            Err(GcError::DeadlineExceeded { stage: "listing" })
        ));
    }
}
