// Constants for the retry stage
use std::time::Duration;

/// Default starting backoff delay.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(1000);

/// Default upper bound for backoff delay growth.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_millis(15_000);

/// Default total number of attempts, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// Lower bound of the jitter multiplier range.
pub const MIN_JITTER_FACTOR: f64 = 1.5;

/// Upper bound (exclusive) of the jitter multiplier range.
pub const MAX_JITTER_FACTOR: f64 = 2.5;

/// Minimum allowed max_attempts value.
pub const MIN_MAX_ATTEMPTS: u32 = 1;

/// Maximum allowed max_attempts value.
pub const MAX_MAX_ATTEMPTS: u32 = 100;

/// Capacity of the per-stage broadcast channel cancellation watchers
/// subscribe to. Sized well above the number of superseding events a key
/// can see during one backoff delay; an overrun receiver cancels its
/// retry rather than risk forwarding a stale one.
pub const SUPERSEDE_CHANNEL_CAPACITY: usize = 64;
