//! Backoff scheduling: computing the next re-submission delay.
//!
//! Each retry starts from the delay its operation last waited for (carried
//! in the operation's retry metadata), not from the initial minimum, so
//! growth is per key and keys never interact. The jitter multiplier is a
//! uniform draw from `[1.5, 2.5)`; it is only applied while the scaled
//! delay stays under the configured maximum, which caps growth near that
//! maximum instead of clamping to it exactly.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;
use crate::constants::{MAX_JITTER_FACTOR, MIN_JITTER_FACTOR};

/// Stateless next-delay calculator derived from a [`RetryConfig`].
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    initial_delay: Duration,
    max_delay: Duration,
    random_delay: bool,
}

impl Backoff {
    pub fn new(initial_delay: Duration, max_delay: Duration, random_delay: bool) -> Self {
        Self { initial_delay, max_delay, random_delay }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.initial_delay(), config.max_delay(), config.random_delay())
    }

    /// Compute the delay for the next re-submission given the delay the
    /// previous cycle waited for (or `None` on the first failure).
    pub fn next_delay(&self, previous: Option<Duration>) -> Duration {
        let factor = rand::thread_rng().gen_range(MIN_JITTER_FACTOR..MAX_JITTER_FACTOR);
        self.next_delay_with_factor(previous, factor)
    }

    /// Deterministic core of [`Self::next_delay`], with the jitter factor
    /// supplied by the caller.
    fn next_delay_with_factor(&self, previous: Option<Duration>, factor: f64) -> Duration {
        let delay = previous.unwrap_or(self.initial_delay);
        if self.random_delay {
            let scaled = delay.mul_f64(factor);
            if scaled < self.max_delay {
                return scaled;
            }
        }
        delay
    }
}
