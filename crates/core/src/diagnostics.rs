//! Out-of-band diagnostic events emitted by pipeline stages.
//!
//! Diagnostics are fire-and-forget: they are pushed on an unbounded
//! channel next to the result stream, never through it, and a missing or
//! closed sink silently drops them. Consumers are devtools and log
//! bridges, not program logic.

use tokio::sync::mpsc;

use crate::operation::Operation;

/// A diagnostic event produced by a stage.
#[derive(Debug, Clone)]
pub enum DiagnosticEvent {
    /// A failed operation has been scheduled for re-submission.
    RetryAttempt {
        /// The operation that failed and triggered the retry.
        operation: Operation,
        /// The attempt counter the re-submission will carry.
        attempt_count: u32,
    },
    /// A failed operation has exhausted its retry attempts; the failure
    /// is being delivered to the caller.
    RetryExhausted { operation: Operation },
}

/// Where stages push their diagnostic events.
pub type DiagnosticSink = mpsc::UnboundedSender<DiagnosticEvent>;
