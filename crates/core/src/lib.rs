//! # Wireline Core
//!
//! Foundation types for the Wireline query client pipeline.
//!
//! This crate contains:
//! - The operation model (`Operation`, `OperationKey`, `OperationKind`,
//!   `OperationContext`)
//! - The result model (`OperationResult`, `ResponseData`, `QueryError`)
//! - The pipeline seam (`Stage`, `ForwardFn`, `Transport`)
//! - Out-of-band diagnostic event shapes
//!
//! ## Architecture
//! - No dependencies on other Wireline crates
//! - Only external dependencies allowed
//! - Middleware stages (retry, caching, dedup, ...) live in their own
//!   crates and depend on this one

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod diagnostics;
pub mod operation;
pub mod result;
pub mod stage;

// Re-export commonly used items
pub use diagnostics::{DiagnosticEvent, DiagnosticSink};
pub use operation::{Operation, OperationContext, OperationKey, OperationKind};
pub use result::{
    NetworkFailure, NetworkFailureKind, OperationResult, QueryError, RemoteError, ResponseData,
};
pub use stage::{forward_fn, ForwardFn, OperationStream, ResultStream, Stage, Transport};
