//! Retry policy with exponential backoff

use std::time::Duration;

/// Smallest accepted base delay; a zero delay is raised to this.
pub const MIN_BASE_DELAY: Duration = Duration::from_millis(1);

/// How many times a remote call may be retried and how long to wait between tries.
///
/// The delay before attempt `k` (0-based, `k >= 1`) is `base_delay * 2^(k-1)`,
/// so the waits grow strictly: `base, 2*base, 4*base, ...`. The base delay is
/// never below [`MIN_BASE_DELAY`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the given retry budget and base delay
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay: base_delay.max(MIN_BASE_DELAY),
        }
    }

    /// Maximum number of retries, not counting the initial attempt
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before the first retry
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Set maximum retry attempts
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay.max(MIN_BASE_DELAY);
        self
    }

    /// Upper bound on the number of times the operation is invoked
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Sleep taken after failed attempt `attempt` (0-based) before the next one
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Delay before the attempt with 0-based index `attempt`; zero for the first.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        match attempt {
            0 => Duration::ZERO,
            k => self.backoff_after(k - 1),
        }
    }

    /// Total time spent sleeping if every attempt fails retryably
    pub fn worst_case_delay(&self) -> Duration {
        (1..=self.max_retries)
            .map(|k| self.delay_before(k))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Policy presets for calls whose budget does not follow the configured one
pub mod presets {
    use super::*;

    /// Ollama model listing: three tries in total, the daemon is slow to come up
    pub fn ollama_listing() -> RetryPolicy {
        RetryPolicy::new(2, Duration::from_secs(5))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries(), 3);
        assert_eq!(policy.base_delay(), Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn test_policy_builder() {
        let policy = RetryPolicy::default()
            .with_max_retries(5)
            .with_base_delay(Duration::from_millis(200));

        assert_eq!(policy.max_retries(), 5);
        assert_eq!(policy.base_delay(), Duration::from_millis(200));
    }

    #[test]
    fn test_delay_doubles_from_base() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1));

        assert_eq!(policy.delay_before(0), Duration::ZERO);
        assert_eq!(policy.delay_before(1), Duration::from_secs(1));
        assert_eq!(policy.delay_before(2), Duration::from_secs(2));
        assert_eq!(policy.delay_before(3), Duration::from_secs(4));
        assert_eq!(policy.worst_case_delay(), Duration::from_secs(7));
    }

    #[test]
    fn test_delay_is_strictly_increasing() {
        let policy = RetryPolicy::new(10, Duration::from_millis(3));
        for k in 1..10 {
            assert!(policy.delay_before(k + 1) > policy.delay_before(k));
        }
    }

    #[test]
    fn test_huge_attempt_saturates() {
        let policy = RetryPolicy::new(u32::MAX, Duration::from_secs(1));
        assert!(policy.delay_before(200) >= policy.delay_before(30));
        assert_eq!(policy.max_attempts(), u32::MAX);
    }

    #[test]
    fn test_zero_base_delay_is_raised() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        assert_eq!(policy.base_delay(), MIN_BASE_DELAY);
        assert!(policy.delay_before(2) > policy.delay_before(1));

        let policy = RetryPolicy::default().with_base_delay(Duration::ZERO);
        assert_eq!(policy.base_delay(), MIN_BASE_DELAY);
    }

    #[test]
    fn test_ollama_listing_preset() {
        let policy = presets::ollama_listing();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.base_delay(), Duration::from_secs(5));
        assert_eq!(policy.worst_case_delay(), Duration::from_secs(15));
    }
}
