//! # Fibonacci Backoff
//!
//! Throttles watch reconnects after stream failures. The delay grows along
//! the Fibonacci sequence, more slowly than exponential backoff, and is capped
//! at a configured maximum.
//!
//! ## Usage
//!
//! ```rust
//! use certificate_controller::controller::backoff::FibonacciBackoff;
//! use std::time::Duration;
//!
//! let mut backoff = FibonacciBackoff::new(1000, 30_000);
//! assert_eq!(backoff.next_backoff(), Duration::from_millis(1000));
//! assert_eq!(backoff.next_backoff(), Duration::from_millis(1000));
//! assert_eq!(backoff.next_backoff(), Duration::from_millis(2000));
//! assert_eq!(backoff.next_backoff(), Duration::from_millis(3000));
//! ```

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, starting from `min_ms` twice.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_ms: u64,
    prev_ms: u64,
    current_ms: u64,
    max_ms: u64,
}

impl FibonacciBackoff {
    /// Create a backoff starting at `min_ms` and capped at `max_ms`
    ///
    /// A `max_ms` below `min_ms` is raised to `min_ms`.
    #[must_use]
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms,
            prev_ms: 0,
            current_ms: min_ms,
            max_ms: max_ms.max(min_ms),
        }
    }

    /// Get the next delay in milliseconds and advance the sequence
    pub fn next_backoff_millis(&mut self) -> u64 {
        let result = self.current_ms;
        let next = self.prev_ms.saturating_add(self.current_ms);
        self.prev_ms = self.current_ms;
        self.current_ms = next.min(self.max_ms);
        result
    }

    /// Get the next delay as a `Duration` and advance the sequence
    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_millis(self.next_backoff_millis())
    }

    /// Restart the sequence from `min_ms`
    pub fn reset(&mut self) {
        self.prev_ms = 0;
        self.current_ms = self.min_ms;
    }
}
