//! The operation model: request descriptors flowing down the pipeline.
//!
//! An [`Operation`] identifies one logical request via its [`OperationKey`].
//! Re-issues of the same logical request (including retries) carry the same
//! key; everything else about an operation is immutable data. Stages never
//! mutate an operation in place; they derive a new value and forward that,
//! so concurrently in-flight operations cannot interfere with each other.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stable identity of a logical request across re-issues and retries.
///
/// Keys are assigned by the client that feeds the pipeline; the pipeline
/// itself only compares them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationKey(u64);

impl OperationKey {
    pub const fn new(key: u64) -> Self {
        Self(key)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for OperationKey {
    fn from(key: u64) -> Self {
        Self(key)
    }
}

/// What kind of request an operation represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// A read request expecting a single response.
    Query,
    /// A write request; never implicitly re-issued by the client.
    Mutation,
    /// A long-lived request producing a stream of responses.
    Subscription,
    /// A signal that the caller no longer needs results for this key.
    Teardown,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
            OperationKind::Teardown => "teardown",
        };
        f.write_str(name)
    }
}

/// Metadata carried alongside an operation.
///
/// The `extensions` map is opaque caller data and travels untouched.
/// `retry_count` and `retry_delay` are owned by the retry stage: they are
/// zero/unset on a fresh operation and only ever set through
/// [`Operation::with_retry_state`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationContext {
    /// Number of re-submissions this operation has been through so far.
    #[serde(default)]
    pub retry_count: u32,
    /// Backoff delay the last re-submission waited for, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<Duration>,
    /// Opaque caller metadata.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extensions: serde_json::Map<String, Value>,
}

/// A request descriptor flowing down the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    key: OperationKey,
    kind: OperationKind,
    context: OperationContext,
}

impl Operation {
    /// Create a fresh operation with an empty context.
    pub fn new(key: impl Into<OperationKey>, kind: OperationKind) -> Self {
        Self { key: key.into(), kind, context: OperationContext::default() }
    }

    /// Create an operation carrying caller metadata.
    pub fn with_extensions(
        key: impl Into<OperationKey>,
        kind: OperationKind,
        extensions: serde_json::Map<String, Value>,
    ) -> Self {
        Self {
            key: key.into(),
            kind,
            context: OperationContext { extensions, ..OperationContext::default() },
        }
    }

    pub fn key(&self) -> OperationKey {
        self.key
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn context(&self) -> &OperationContext {
        &self.context
    }

    /// Whether this operation is a re-submission produced by the retry stage.
    pub fn is_retry(&self) -> bool {
        self.context.retry_count > 0
    }

    /// Derive the next re-submission of this operation.
    ///
    /// Returns a new value with the given retry metadata; `self` is left
    /// untouched. Caller extensions are carried over verbatim.
    pub fn with_retry_state(&self, retry_count: u32, retry_delay: Duration) -> Self {
        Self {
            key: self.key,
            kind: self.kind,
            context: OperationContext {
                retry_count,
                retry_delay: Some(retry_delay),
                extensions: self.context.extensions.clone(),
            },
        }
    }
}
