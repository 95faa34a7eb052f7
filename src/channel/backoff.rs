//! Bounded exponential backoff for channel reconnects.

use std::time::Duration;

pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Reconnects allowed after consecutive abnormal closes; the next close is terminal.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before reconnect number `attempt` (1-based), or `None` once the cap is exceeded.
    ///
    /// `base * 2^(attempt-1)`, clamped to `max_delay`.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        let delay = self
            .base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay);
        Some(delay.min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_attempt_uses_base_delay() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(1), Some(DEFAULT_BASE_DELAY));
    }

    #[test]
    fn test_delay_doubles_then_caps() {
        let policy = ReconnectPolicy {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
            max_attempts: 10,
        };
        let delays: Vec<u128> = (1..=6)
            .map(|n| policy.delay_for(n).unwrap().as_millis())
            .collect();
        assert_eq!(delays, vec![500, 1000, 2000, 3000, 3000, 3000]);
    }

    #[test]
    fn test_cap_exceeded_returns_none() {
        let policy = ReconnectPolicy::default();
        assert!(policy.delay_for(DEFAULT_MAX_ATTEMPTS).is_some());
        assert!(policy.delay_for(DEFAULT_MAX_ATTEMPTS + 1).is_none());
        assert!(policy.delay_for(0).is_none());
    }

    #[test]
    fn test_huge_attempt_counts_do_not_overflow() {
        let policy = ReconnectPolicy {
            max_attempts: u32::MAX,
            ..Default::default()
        };
        assert_eq!(policy.delay_for(200), Some(DEFAULT_MAX_DELAY));
    }
}
