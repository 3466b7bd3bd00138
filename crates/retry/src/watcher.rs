//! Cancellation watching for pending retries.
//!
//! While a retry waits out its backoff delay, the caller may move on:
//! either by tearing the operation down or by re-issuing the same logical
//! request. Both make the pending retry stale. The watcher observes the
//! broadcast of inbound operations (re-submissions never traverse it, so
//! any same-key query seen there is a fresh issuance) and resolves when a
//! superseding event for its key arrives. The retry task races this
//! against its delay; first arrival wins.

use tokio::sync::broadcast;
use tracing::{debug, warn};

use wireline_core::{Operation, OperationKey, OperationKind};

/// Observer for superseding events targeting one pending retry.
pub(crate) struct CancellationWatcher {
    key: OperationKey,
    operations: broadcast::Receiver<Operation>,
}

impl CancellationWatcher {
    /// The receiver must be subscribed before the retry's delay starts,
    /// otherwise events arriving early in the delay window are missed.
    pub(crate) fn new(key: OperationKey, operations: broadcast::Receiver<Operation>) -> Self {
        Self { key, operations }
    }

    /// Resolves when a superseding operation for the watched key is
    /// observed. Never resolves if no such operation arrives.
    pub(crate) async fn superseded(mut self) {
        loop {
            match self.operations.recv().await {
                Ok(operation) => {
                    if supersedes(&operation, self.key) {
                        debug!(
                            key = %self.key,
                            kind = %operation.kind(),
                            "pending retry superseded"
                        );
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // A superseding event may be among the dropped
                    // messages; cancel rather than forward a stale retry.
                    warn!(key = %self.key, skipped, "supersede watcher lagged, canceling retry");
                    return;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    // Inbound stream ended; nothing can supersede anymore.
                    std::future::pending::<()>().await;
                }
            }
        }
    }
}

/// Whether `operation` supersedes a pending retry for `key`: an explicit
/// teardown, or a fresh query for the same logical request.
fn supersedes(operation: &Operation, key: OperationKey) -> bool {
    operation.key() == key
        && matches!(operation.kind(), OperationKind::Teardown | OperationKind::Query)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn teardown_and_query_supersede_same_key() {
        let key = OperationKey::new(7);
        assert!(supersedes(&Operation::new(7, OperationKind::Teardown), key));
        assert!(supersedes(&Operation::new(7, OperationKind::Query), key));
    }

    #[test]
    fn other_keys_and_mutations_do_not_supersede() {
        let key = OperationKey::new(7);
        assert!(!supersedes(&Operation::new(8, OperationKind::Teardown), key));
        assert!(!supersedes(&Operation::new(7, OperationKind::Mutation), key));
        assert!(!supersedes(&Operation::new(7, OperationKind::Subscription), key));
    }

    #[tokio::test]
    async fn resolves_on_matching_teardown() {
        let (tx, rx) = broadcast::channel(8);
        let watcher = CancellationWatcher::new(OperationKey::new(1), rx);
        let handle = tokio::spawn(watcher.superseded());

        tx.send(Operation::new(2, OperationKind::Teardown)).expect("receiver alive");
        tx.send(Operation::new(1, OperationKind::Mutation)).expect("receiver alive");
        tx.send(Operation::new(1, OperationKind::Teardown)).expect("receiver alive");

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("watcher should resolve")
            .expect("watcher task should not panic");
    }

    /// A closed inbound stream means no superseding event can ever arrive;
    /// the watcher must stay pending so the delay arm wins the race.
    #[tokio::test(start_paused = true)]
    async fn stays_pending_after_channel_close() {
        let (tx, rx) = broadcast::channel(8);
        let watcher = CancellationWatcher::new(OperationKey::new(1), rx);
        drop(tx);

        let result = tokio::time::timeout(Duration::from_secs(60), watcher.superseded()).await;
        assert!(result.is_err(), "watcher resolved after channel close");
    }
}
