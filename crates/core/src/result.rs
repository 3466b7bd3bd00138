//! The result model: outcomes produced by the executor for each operation.
//!
//! A [`QueryError`] distinguishes transport-level failures (the request
//! never completed: DNS, connect, timeout, reset) from structured errors
//! returned by the remote side. Retry eligibility downstream keys off that
//! distinction, so the two are kept as separate fields rather than folded
//! into one message.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::operation::Operation;

/// Success payload returned by the executor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    /// The response body.
    pub data: Value,
    /// Transport- or server-provided response metadata.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extensions: serde_json::Map<String, Value>,
}

impl ResponseData {
    pub fn new(data: Value) -> Self {
        Self { data, extensions: serde_json::Map::new() }
    }
}

/// Coarse classification of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkFailureKind {
    /// Connect or read deadline elapsed.
    Timeout,
    /// Connection could not be established or was lost mid-flight.
    Connection,
    /// Name resolution failed.
    Dns,
    /// Any other transport-level failure.
    Other,
}

impl fmt::Display for NetworkFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkFailureKind::Timeout => "timeout",
            NetworkFailureKind::Connection => "connection",
            NetworkFailureKind::Dns => "dns",
            NetworkFailureKind::Other => "network",
        };
        f.write_str(name)
    }
}

/// A transport-level failure: the request never produced a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{kind} error: {message}")]
pub struct NetworkFailure {
    pub kind: NetworkFailureKind,
    pub message: String,
}

impl NetworkFailure {
    pub fn new(kind: NetworkFailureKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }
}

/// A structured error entry reported by the remote side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    pub message: String,
    /// Machine-readable error code, when the server provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Path into the request document this error applies to.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub extensions: serde_json::Map<String, Value>,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            path: Vec::new(),
            extensions: serde_json::Map::new(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{}] {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// The error half of an [`OperationResult`].
///
/// Carries an optional network-level failure and zero or more remote error
/// entries. A result with neither is not an error and must be represented
/// as a success instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkFailure>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remote: Vec<RemoteError>,
}

impl QueryError {
    /// An error caused by a transport-level failure.
    pub fn network(failure: NetworkFailure) -> Self {
        Self { network: Some(failure), remote: Vec::new() }
    }

    /// An error composed of remote-side entries only.
    pub fn remote(errors: Vec<RemoteError>) -> Self {
        Self { network: None, remote: errors }
    }

    /// Whether this error carries a network-level failure indicator.
    ///
    /// This is the default retry-eligibility classifier: remote errors
    /// alone are terminal unless the caller overrides the predicate.
    pub fn is_network_failure(&self) -> bool {
        self.network.is_some()
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.network, self.remote.len()) {
            (Some(network), 0) => write!(f, "{}", network),
            (Some(network), n) => write!(f, "{} (+{} remote error(s))", network, n),
            (None, 0) => f.write_str("unknown query error"),
            (None, _) => {
                let mut first = true;
                for err in &self.remote {
                    if !first {
                        f.write_str("; ")?;
                    }
                    write!(f, "{}", err)?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for QueryError {}

/// The outcome of executing one operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    /// The operation this result belongs to, retry metadata included.
    pub operation: Operation,
    /// Success payload or error.
    pub response: Result<ResponseData, QueryError>,
}

impl OperationResult {
    pub fn ok(operation: Operation, data: ResponseData) -> Self {
        Self { operation, response: Ok(data) }
    }

    pub fn err(operation: Operation, error: QueryError) -> Self {
        Self { operation, response: Err(error) }
    }

    /// The error carried by this result, if any.
    pub fn error(&self) -> Option<&QueryError> {
        self.response.as_ref().err()
    }

    pub fn is_ok(&self) -> bool {
        self.response.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::OperationKind;

    #[test]
    fn network_error_is_classified_as_network_failure() {
        let err = QueryError::network(NetworkFailure::new(
            NetworkFailureKind::Connection,
            "connection reset by peer",
        ));
        assert!(err.is_network_failure());
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn remote_errors_alone_are_not_network_failures() {
        let err = QueryError::remote(vec![
            RemoteError::new("field `user` not found").with_code("FIELD_NOT_FOUND"),
            RemoteError::new("rate limited"),
        ]);
        assert!(!err.is_network_failure());
        let rendered = err.to_string();
        assert!(rendered.contains("[FIELD_NOT_FOUND]"));
        assert!(rendered.contains("rate limited"));
    }

    #[test]
    fn result_error_accessor() {
        let op = Operation::new(1, OperationKind::Query);
        let ok = OperationResult::ok(op.clone(), ResponseData::default());
        assert!(ok.is_ok());
        assert!(ok.error().is_none());

        let err = OperationResult::err(
            op,
            QueryError::network(NetworkFailure::new(NetworkFailureKind::Timeout, "read timed out")),
        );
        assert!(!err.is_ok());
        assert!(err.error().expect("error present").is_network_failure());
    }
}
