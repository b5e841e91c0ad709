//! Hook timeout validation and enforcement
//!
//! Each hook may carry a wall-clock limit in whole seconds. Limits are
//! validated when the hook model is built; enforcement is a [`Deadline`]
//! polled by the runner while the child process is alive. Expiry is treated
//! exactly like a non-zero exit for `continue_on_error` purposes.

use std::time::{Duration, Instant};

/// Upper bound for a single hook (one day)
pub const MAX_HOOK_TIMEOUT_SECONDS: i64 = 86_400;

/// Validate a configured timeout in seconds, bounds (0, 86400].
pub fn hook_timeout(seconds: i64) -> Result<Duration, TimeoutValidationError> {
    if seconds <= 0 || seconds > MAX_HOOK_TIMEOUT_SECONDS {
        return Err(TimeoutValidationError::OutOfBounds { value: seconds });
    }
    Ok(Duration::from_secs(seconds as u64))
}

/// Timeout validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeoutValidationError {
    #[error("timeout must be in (0, 86400] seconds, got {value}")]
    OutOfBounds { value: i64 },

    #[error("timeout must be an integer number of seconds, got '{value}'")]
    NotAnInteger { value: String },
}

/// Timeout check result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutStatus {
    /// No timeout has occurred
    Ok,
    /// Wall-clock limit exceeded
    Expired,
}

impl TimeoutStatus {
    /// Returns true if a timeout occurred
    pub fn is_timeout(&self) -> bool {
        matches!(self, TimeoutStatus::Expired)
    }
}

/// Wall-clock deadline for one hook execution.
///
/// The deadline does not kill anything itself; the caller polls
/// [`Deadline::check`] and terminates the process on expiry.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    /// Start a deadline now. `None` never expires.
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            start: Instant::now(),
            limit,
        }
    }

    /// Check for expiry
    pub fn check(&self) -> TimeoutStatus {
        match self.limit {
            Some(limit) if self.start.elapsed() > limit => TimeoutStatus::Expired,
            _ => TimeoutStatus::Ok,
        }
    }

    /// Time since the deadline started
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Time left before expiry, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.limit.map(|limit| limit.saturating_sub(self.elapsed()))
    }

    /// The configured limit
    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_hook_timeout_bounds() {
        assert_eq!(hook_timeout(30), Ok(Duration::from_secs(30)));
        assert_eq!(hook_timeout(86_400), Ok(Duration::from_secs(86_400)));
        assert!(matches!(
            hook_timeout(0),
            Err(TimeoutValidationError::OutOfBounds { value: 0 })
        ));
        assert!(matches!(
            hook_timeout(-5),
            Err(TimeoutValidationError::OutOfBounds { .. })
        ));
        assert!(matches!(
            hook_timeout(86_401),
            Err(TimeoutValidationError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_deadline_unbounded_never_expires() {
        let deadline = Deadline::new(None);
        assert_eq!(deadline.check(), TimeoutStatus::Ok);
        assert_eq!(deadline.remaining(), None);
    }

    #[test]
    fn test_deadline_expires() {
        let deadline = Deadline::new(Some(Duration::from_millis(50)));
        assert_eq!(deadline.check(), TimeoutStatus::Ok);

        sleep(Duration::from_millis(120));

        assert_eq!(deadline.check(), TimeoutStatus::Expired);
        assert!(deadline.check().is_timeout());
        assert_eq!(deadline.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_timeout_status_is_timeout() {
        assert!(!TimeoutStatus::Ok.is_timeout());
        assert!(TimeoutStatus::Expired.is_timeout());
    }
}
