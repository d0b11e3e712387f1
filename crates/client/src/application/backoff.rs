use std::time::Duration;

/// Exponential reconnect policy.
///
/// The n-th consecutive failed attempt (1-based) waits
/// `min(base * 2^(n-1), max)`. There is no retry limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub enabled: bool,
    pub base: Duration,
    pub max: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            enabled: true,
            base: Duration::from_millis(1000),
            max: Duration::from_millis(30_000),
        }
    }
}

impl ReconnectPolicy {
    pub fn new(base: Duration, max: Duration) -> Self {
        ReconnectPolicy {
            enabled: true,
            base,
            max: max.max(base),
        }
    }

    pub fn disabled() -> Self {
        ReconnectPolicy {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 2u32.saturating_pow(exponent);
        self.base
            .checked_mul(factor)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sequence() {
        let policy = ReconnectPolicy::default();
        let delays: Vec<u64> = (1..=7)
            .map(|n| policy.delay_for_attempt(n).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000, 30000, 30000]);
    }

    #[test]
    fn test_monotonic_and_capped() {
        let policy = ReconnectPolicy::new(Duration::from_millis(250), Duration::from_secs(10));
        let mut prev = Duration::ZERO;
        for attempt in 1..200 {
            let delay = policy.delay_for_attempt(attempt);
            assert!(delay >= prev);
            assert!(delay <= policy.max);
            prev = delay;
        }
        assert_eq!(prev, policy.max);
    }

    #[test]
    fn test_attempt_zero_uses_base() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), policy.base);
    }

    #[test]
    fn test_max_never_below_base() {
        let policy = ReconnectPolicy::new(Duration::from_secs(5), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(5));
    }
}
