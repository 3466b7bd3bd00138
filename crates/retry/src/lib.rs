//! # Wireline Retry
//!
//! Retry middleware for the Wireline query client pipeline.
//!
//! [`RetryStage`] intercepts failed operation results and re-issues the
//! originating operation after an exponentially-backed-off, jittered
//! delay, up to a bounded number of attempts. A pending retry is
//! suppressed when the caller tears the operation down or re-issues the
//! same logical request before the delay elapses.
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use wireline_core::{forward_fn, Stage};
//! use wireline_retry::{RetryConfig, RetryStage};
//!
//! let config = RetryConfig::builder()
//!     .initial_delay(Duration::from_millis(500))
//!     .max_attempts(4)
//!     .build()?;
//!
//! let results = RetryStage::new(config).apply(operations, forward_fn(transport));
//! ```
//!
//! Failed results that are not retryable, and the last failure once
//! attempts are exhausted, always reach the caller. Cancellation is
//! silent: a superseded retry produces no result and no diagnostic.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod backoff;
pub mod config;
pub mod constants;
pub mod exchange;
mod watcher;

// Re-export commonly used items
pub use backoff::Backoff;
pub use config::{ConfigError, RetryConfig, RetryConfigBuilder, RetryPredicate};
pub use exchange::RetryStage;
