//! # Fibonacci Backoff
//!
//! Progressive delays for retrying SCIM calls that failed with a throttling,
//! server or transport error. Grows more slowly than exponential backoff, so a
//! handful of retries stays within a sync cycle.
//!
//! Values are in milliseconds.
//!
//! ```rust
//! use idp_scim_sync::backoff::FibonacciBackoff;
//!
//! let mut backoff = FibonacciBackoff::new(100, 1000);
//! assert_eq!(backoff.next_backoff_ms(), 100);
//! assert_eq!(backoff.next_backoff_ms(), 100);
//! assert_eq!(backoff.next_backoff_ms(), 200);
//! assert_eq!(backoff.next_backoff_ms(), 300);
//! assert_eq!(backoff.next_backoff_ms(), 500);
//! ```

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, starting from `min_ms` twice and
/// capped at `max_ms`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_ms: u64,
    prev_ms: u64,
    current_ms: u64,
    max_ms: u64,
}

impl FibonacciBackoff {
    #[must_use]
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms,
            prev_ms: 0,
            current_ms: min_ms,
            max_ms,
        }
    }

    /// Return the current delay and advance the sequence
    pub fn next_backoff_ms(&mut self) -> u64 {
        let result = self.current_ms;
        let next = self.prev_ms.saturating_add(self.current_ms);

        self.prev_ms = self.current_ms;
        self.current_ms = next.min(self.max_ms);

        result
    }

    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_millis(self.next_backoff_ms())
    }

    /// Restart the sequence from `min_ms`
    pub fn reset(&mut self) {
        self.prev_ms = 0;
        self.current_ms = self.min_ms;
    }
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(
            crate::constants::DEFAULT_BACKOFF_START_MS,
            crate::constants::DEFAULT_BACKOFF_MAX_MS,
        )
    }
}
