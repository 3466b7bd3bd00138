//! The pipeline seam: how stages, the executor, and the client compose.
//!
//! A pipeline is a chain of [`Stage`]s terminated by a forward function
//! that performs the actual network execution. Each stage receives the
//! stream of inbound operations plus the forward function representing
//! everything downstream of it, and returns the stream of results the
//! stages above it (ultimately the client) will observe. Stages are free
//! to suppress, delay, or re-issue operations, as long as results for
//! non-intercepted operations keep the shape and ordering `forward` gave
//! them.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use crate::operation::{Operation, OperationKind};
use crate::result::OperationResult;

/// The stream of operations flowing into a stage.
pub type OperationStream = BoxStream<'static, Operation>;

/// The stream of results flowing out of a stage.
pub type ResultStream = BoxStream<'static, OperationResult>;

/// Everything downstream of a stage, as a function over streams.
pub type ForwardFn = Arc<dyn Fn(OperationStream) -> ResultStream + Send + Sync>;

/// A middleware element of the client pipeline.
pub trait Stage: Send + Sync {
    /// Wire this stage between the inbound operation stream and the rest
    /// of the pipeline.
    fn apply(&self, operations: OperationStream, forward: ForwardFn) -> ResultStream;
}

/// The executor collaborator: performs one operation against the network.
///
/// Implementations produce exactly one result per non-teardown operation
/// handed to them through [`forward_fn`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, operation: Operation) -> OperationResult;
}

/// Adapt a [`Transport`] into the stream-level [`ForwardFn`] contract.
///
/// Operations are executed sequentially in arrival order. Teardown
/// operations are control flow, not requests: they are dropped without
/// producing a result.
pub fn forward_fn(transport: Arc<dyn Transport>) -> ForwardFn {
    Arc::new(move |mut operations: OperationStream| {
        let transport = Arc::clone(&transport);
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(operation) = operations.next().await {
                if operation.kind() == OperationKind::Teardown {
                    debug!(key = %operation.key(), "dropping teardown at transport");
                    continue;
                }
                let result = transport.execute(operation).await;
                if tx.send(result).is_err() {
                    // Result stream was dropped; stop executing.
                    break;
                }
            }
        });

        UnboundedReceiverStream::new(rx).boxed()
    })
}
