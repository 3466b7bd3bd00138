//! The retry stage: broadcast/merge wiring, result filtering, and retry
//! scheduling.
//!
//! Applying the stage spawns three kinds of task:
//!
//! - a **pump**, the single consumer of the inbound operation stream. It
//!   multicasts every inbound operation to the supersede broadcast (for
//!   cancellation watchers) and into the merged channel feeding the
//!   executor. Watchers subscribe to the broadcast, never to the inbound
//!   stream itself, so observing operations twice cannot issue them twice.
//! - a **filter**, the single consumer of the executor's result stream.
//!   Results pass through to the caller unless they carry a retryable
//!   error with attempts remaining, in which case the result is suppressed
//!   and a retry is scheduled in its place.
//! - one short-lived **retry task** per scheduled retry, racing the
//!   backoff delay against its cancellation watcher and against pipeline
//!   disposal. If the delay wins, the derived operation re-enters the
//!   merged channel, indistinguishable from an inbound operation except
//!   for its retry metadata.
//!
//! Retry metadata travels inside each operation value, so concurrent keys
//! back off independently and no shared counters exist. Dropping the
//! returned result stream cancels the stage token, which tears down the
//! pump, the filter, and every pending retry task.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use wireline_core::{
    DiagnosticEvent, DiagnosticSink, ForwardFn, Operation, OperationResult, OperationStream,
    ResultStream, Stage,
};

use crate::backoff::Backoff;
use crate::config::RetryConfig;
use crate::constants::SUPERSEDE_CHANNEL_CAPACITY;
use crate::watcher::CancellationWatcher;

/// Retry middleware for the client pipeline.
///
/// Intercepts failed results, re-issues the originating operation after a
/// jittered exponential backoff, and suppresses pending retries when the
/// caller tears the operation down or re-issues it. See [`RetryConfig`]
/// for the knobs.
pub struct RetryStage {
    config: RetryConfig,
    diagnostics: Option<DiagnosticSink>,
}

impl RetryStage {
    pub fn new(config: RetryConfig) -> Self {
        Self { config, diagnostics: None }
    }

    /// Register a fire-and-forget sink for retry diagnostics.
    pub fn with_diagnostics(mut self, sink: DiagnosticSink) -> Self {
        self.diagnostics = Some(sink);
        self
    }
}

impl Stage for RetryStage {
    fn apply(&self, operations: OperationStream, forward: ForwardFn) -> ResultStream {
        let config = self.config.clone();
        let diagnostics = Diagnostics { sink: self.diagnostics.clone() };
        let token = CancellationToken::new();

        let (merged_tx, merged_rx) = mpsc::unbounded_channel::<Operation>();
        let (supersede_tx, _) = broadcast::channel::<Operation>(SUPERSEDE_CHANNEL_CAPACITY);

        tokio::spawn(pump_task(
            operations,
            merged_tx.clone(),
            supersede_tx.clone(),
            token.clone(),
        ));

        let results = forward(UnboundedReceiverStream::new(merged_rx).boxed());

        let (out_tx, out_rx) = mpsc::unbounded_channel::<OperationResult>();

        tokio::spawn(filter_task(
            config,
            diagnostics,
            results,
            out_tx,
            merged_tx,
            supersede_tx,
            token,
        ));

        UnboundedReceiverStream::new(out_rx).boxed()
    }
}

/// Single consumer of the inbound stream; multicasts to watchers and
/// feeds the executor path.
async fn pump_task(
    mut operations: OperationStream,
    merged_tx: mpsc::UnboundedSender<Operation>,
    supersede_tx: broadcast::Sender<Operation>,
    token: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            next = operations.next() => match next {
                Some(operation) => {
                    // No live receiver means no retry is pending; nothing
                    // to supersede.
                    let _ = supersede_tx.send(operation.clone());
                    if merged_tx.send(operation).is_err() {
                        break;
                    }
                }
                None => break,
            },
        }
    }
}

/// Single consumer of the executor's results; passes them through or
/// schedules retries in their place.
async fn filter_task(
    config: RetryConfig,
    diagnostics: Diagnostics,
    mut results: ResultStream,
    out_tx: mpsc::UnboundedSender<OperationResult>,
    merged_tx: mpsc::UnboundedSender<Operation>,
    supersede_tx: broadcast::Sender<Operation>,
    token: CancellationToken,
) {
    let backoff = Backoff::from_config(&config);

    loop {
        tokio::select! {
            // The caller dropped the result stream: tear everything down,
            // including pending retries, so no further work or
            // diagnostics happen for abandoned operations.
            _ = out_tx.closed() => break,
            next = results.next() => match next {
                Some(result) => {
                    let passthrough = filter_result(
                        &config,
                        &backoff,
                        &diagnostics,
                        result,
                        &merged_tx,
                        &supersede_tx,
                        &token,
                    );
                    if let Some(result) = passthrough {
                        if out_tx.send(result).is_err() {
                            break;
                        }
                    }
                }
                None => break,
            },
        }
    }

    token.cancel();
}

/// Classify one result: pass-through (returned), or retry scheduled in
/// its place (`None`; the caller never sees this cycle's failure).
fn filter_result(
    config: &RetryConfig,
    backoff: &Backoff,
    diagnostics: &Diagnostics,
    result: OperationResult,
    merged_tx: &mpsc::UnboundedSender<Operation>,
    supersede_tx: &broadcast::Sender<Operation>,
    token: &CancellationToken,
) -> Option<OperationResult> {
    let retryable = match result.error() {
        Some(error) => config.should_retry(error),
        None => false,
    };
    if !retryable {
        return Some(result);
    }

    let attempts = result.operation.context().retry_count;
    if attempts >= config.max_attempts().saturating_sub(1) {
        // The caller always sees the final failure.
        diagnostics.retry_exhausted(&result.operation, config.max_attempts());
        return Some(result);
    }

    let delay = backoff.next_delay(result.operation.context().retry_delay);
    let next = result.operation.with_retry_state(attempts + 1, delay);
    diagnostics.retry_attempt(&result.operation, attempts + 1, config.max_attempts(), delay);

    // Subscribe before the delay starts; a supersede arriving mid-delay
    // must not be missed.
    let watcher = CancellationWatcher::new(next.key(), supersede_tx.subscribe());
    tokio::spawn(retry_task(next, delay, watcher, merged_tx.clone(), token.clone()));

    None
}

/// Wait out the backoff delay, racing cancellation; forward the derived
/// operation only if the delay wins.
async fn retry_task(
    operation: Operation,
    delay: Duration,
    watcher: CancellationWatcher,
    merged_tx: mpsc::UnboundedSender<Operation>,
    token: CancellationToken,
) {
    tokio::select! {
        _ = token.cancelled() => {}
        _ = watcher.superseded() => {
            debug!(key = %operation.key(), "retry discarded before its delay elapsed");
        }
        _ = tokio::time::sleep(delay) => {
            // Uncanceled: re-enter the merged stream. A closed channel
            // means the pipeline shut down while we slept.
            let _ = merged_tx.send(operation);
        }
    }
}

/// Emits retry diagnostics to the optional sink, mirrored as tracing
/// records.
#[derive(Clone)]
struct Diagnostics {
    sink: Option<DiagnosticSink>,
}

impl Diagnostics {
    fn retry_attempt(
        &self,
        operation: &Operation,
        attempt_count: u32,
        max_attempts: u32,
        delay: Duration,
    ) {
        debug!(
            key = %operation.key(),
            attempt = attempt_count,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            "operation failed, retry scheduled"
        );
        self.emit(DiagnosticEvent::RetryAttempt { operation: operation.clone(), attempt_count });
    }

    fn retry_exhausted(&self, operation: &Operation, max_attempts: u32) {
        warn!(
            key = %operation.key(),
            max_attempts,
            "retry attempts exhausted, delivering failure"
        );
        self.emit(DiagnosticEvent::RetryExhausted { operation: operation.clone() });
    }

    fn emit(&self, event: DiagnosticEvent) {
        if let Some(sink) = &self.sink {
            // Fire-and-forget: a missing or closed sink drops the event.
            let _ = sink.send(event);
        }
    }
}
