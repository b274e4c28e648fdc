//! Delivery policy for reading pushes.
//!
//! Some devices silently drop the first message they receive after coming
//! into range, so every push is sent twice: once immediately, and once more
//! after a fixed delay, regardless of how the first attempt went.

use std::time::Duration;

/// Delay before the repeated delivery attempt.
pub const DEFAULT_REPEAT_DELAY: Duration = Duration::from_secs(5);

/// How a single push is delivered to one app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPolicy {
    /// Send once, then send the identical payload again after `repeat_after`.
    SendTwice {
        /// Delay between the end of the first attempt and the start of the second.
        repeat_after: Duration,
    },
}

impl DeliveryPolicy {
    /// Create a send-twice policy with the given repeat delay.
    pub fn send_twice(repeat_after: Duration) -> Self {
        Self::SendTwice { repeat_after }
    }

    /// Delay to wait before each attempt, in attempt order.
    ///
    /// The first attempt never waits.
    pub fn attempt_delays(&self) -> Vec<Duration> {
        match self {
            Self::SendTwice { repeat_after } => vec![Duration::ZERO, *repeat_after],
        }
    }

    /// Total number of attempts per push.
    pub fn attempts(&self) -> usize {
        self.attempt_delays().len()
    }
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self::send_twice(DEFAULT_REPEAT_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_two_attempts_five_seconds_apart() {
        let policy = DeliveryPolicy::default();
        assert_eq!(policy.attempts(), 2);
        assert_eq!(
            policy.attempt_delays(),
            vec![Duration::ZERO, Duration::from_secs(5)]
        );
    }

    #[test]
    fn first_attempt_is_immediate() {
        let policy = DeliveryPolicy::send_twice(Duration::from_millis(250));
        assert_eq!(policy.attempt_delays()[0], Duration::ZERO);
        assert_eq!(policy.attempt_delays()[1], Duration::from_millis(250));
    }
}
