//! Error taxonomy for store-backed operations.
//!
//! Every operation exposed by the access layer resolves to a
//! [`CacheResult`]: either the operation's value or a [`CacheError`]
//! carrying one kind from the closed [`ErrorKind`] enumeration plus the
//! underlying cause. Business outcomes such as "lock not acquired" or
//! "ceiling reached" are values, not errors; only genuine failures travel
//! through this type.

use std::error::Error as StdError;

/// Closed set of failure categories.
///
/// Classification happens exactly once, at the transport boundary; callers
/// can branch on the kind without string-matching messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The operation was interrupted before completion.
    Interrupted,
    /// The store did not answer within the transport deadline.
    Timeout,
    /// Caller-requested short-circuit of a composite operation.
    Break,
    /// The store rejected the request or returned an unexpected shape.
    StoreInternal,
    /// The store is unreachable, or the health gate rejected the call.
    ConnectionFailed,
    /// The addressed key does not exist where existence was required.
    KeyNotFound,
    /// Configuration failed validation.
    InvalidConfig,
    /// Local misuse: unregistered script name, malformed parameters.
    InvalidOperation,
    /// Cluster topology cannot serve the request right now.
    TopologyNotReady,
    /// A liveness probe failed.
    HealthCheckFailed,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Interrupted => "INTERRUPTED",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Break => "BREAK",
            ErrorKind::StoreInternal => "STORE_INTERNAL",
            ErrorKind::ConnectionFailed => "CONNECTION_FAILED",
            ErrorKind::KeyNotFound => "KEY_NOT_FOUND",
            ErrorKind::InvalidConfig => "INVALID_CONFIG",
            ErrorKind::InvalidOperation => "INVALID_OPERATION",
            ErrorKind::TopologyNotReady => "TOPOLOGY_NOT_READY",
            ErrorKind::HealthCheckFailed => "HEALTH_CHECK_FAILED",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured operation failure: one [`ErrorKind`], a human-readable
/// message, and the underlying cause when one exists.
#[derive(Debug, thiserror::Error)]
#[error("[{kind}] {message}")]
pub struct CacheError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

/// Uniform result shape for every store-backed operation.
pub type CacheResult<T> = Result<T, CacheError>;

impl CacheError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConnectionFailed, message)
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConfig, message)
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOperation, message)
    }

    pub fn key_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::KeyNotFound, message)
    }

    pub fn store_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StoreInternal, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_key_not_found(&self) -> bool {
        self.kind == ErrorKind::KeyNotFound
    }

    /// Whether a retry against the same endpoint can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Timeout
                | ErrorKind::ConnectionFailed
                | ErrorKind::TopologyNotReady
                | ErrorKind::HealthCheckFailed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_kind_and_message() {
        let err = CacheError::new(ErrorKind::KeyNotFound, "key 'a' not found");
        assert_eq!(err.to_string(), "[KEY_NOT_FOUND] key 'a' not found");
    }

    #[test]
    fn source_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = CacheError::with_source(ErrorKind::ConnectionFailed, "dial failed", io);
        assert!(err.source().is_some());
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
    }

    #[test]
    fn retryability_follows_kind() {
        assert!(CacheError::connection_failed("down").is_retryable());
        assert!(CacheError::new(ErrorKind::Timeout, "slow").is_retryable());
        assert!(!CacheError::invalid_operation("no such script").is_retryable());
        assert!(!CacheError::key_not_found("missing").is_retryable());
    }

    #[test]
    fn key_not_found_helper() {
        assert!(CacheError::key_not_found("missing").is_key_not_found());
        assert!(!CacheError::store_internal("boom").is_key_not_found());
    }
}
