//! Boundary classification of transport errors.
//!
//! Every `redis::RedisError` or pool failure crosses into the closed
//! taxonomy exactly once, here. Nothing downstream re-wraps or
//! re-classifies, so a given failure always surfaces under the same kind.

use redis::{ErrorKind as RedisErrorKind, RedisError};
use redline_core::{CacheError, ErrorKind};

/// Classify a client/transport error into the taxonomy.
pub(crate) fn classify(err: RedisError) -> CacheError {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped() {
        ErrorKind::ConnectionFailed
    } else {
        match err.kind() {
            RedisErrorKind::TypeError => ErrorKind::StoreInternal,
            RedisErrorKind::ClusterDown
            | RedisErrorKind::MasterDown
            | RedisErrorKind::ClusterConnectionNotFound
            | RedisErrorKind::MasterNameNotFoundBySentinel
            | RedisErrorKind::NoValidReplicasFoundBySentinel => ErrorKind::TopologyNotReady,
            RedisErrorKind::BusyLoadingError => ErrorKind::TopologyNotReady,
            RedisErrorKind::ResponseError if is_no_such_key(&err) => ErrorKind::KeyNotFound,
            _ => ErrorKind::StoreInternal,
        }
    };
    let message = match kind {
        ErrorKind::Timeout => "store did not answer in time",
        ErrorKind::ConnectionFailed => "store unreachable",
        ErrorKind::KeyNotFound => "key not found",
        ErrorKind::TopologyNotReady => "store topology cannot serve the request",
        _ => "store rejected the request",
    };
    CacheError::with_source(kind, message, err)
}

/// Classify a pool checkout failure. A backend error inside the pool is
/// classified like any other transport error; pool timeouts and a closed
/// pool are connectivity problems of their own.
pub(crate) fn classify_pool(err: deadpool_redis::PoolError) -> CacheError {
    match err {
        deadpool_redis::PoolError::Backend(backend) => classify(backend),
        deadpool_redis::PoolError::Timeout(_) => CacheError::new(
            ErrorKind::Timeout,
            "timed out waiting for a pooled connection",
        ),
        other => CacheError::with_source(
            ErrorKind::ConnectionFailed,
            "connection pool unavailable",
            other,
        ),
    }
}

fn is_no_such_key(err: &RedisError) -> bool {
    err.detail().is_some_and(|detail| detail.contains("no such key"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_error(kind: std::io::ErrorKind) -> RedisError {
        RedisError::from(std::io::Error::new(kind, "io"))
    }

    #[test]
    fn io_failures_are_connectivity() {
        let err = classify(io_error(std::io::ErrorKind::ConnectionRefused));
        assert_eq!(err.kind(), ErrorKind::ConnectionFailed);
    }

    #[test]
    fn io_timeouts_are_timeouts() {
        let err = classify(io_error(std::io::ErrorKind::TimedOut));
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn type_errors_are_internal_not_business() {
        let err = classify(RedisError::from((
            RedisErrorKind::TypeError,
            "unexpected reply shape",
        )));
        assert_eq!(err.kind(), ErrorKind::StoreInternal);
    }

    #[test]
    fn missing_key_response_maps_to_key_not_found() {
        let err = classify(RedisError::from((
            RedisErrorKind::ResponseError,
            "ERR",
            "no such key".to_string(),
        )));
        assert_eq!(err.kind(), ErrorKind::KeyNotFound);
    }

    #[test]
    fn cluster_down_is_topology_not_ready() {
        let err = classify(RedisError::from((
            RedisErrorKind::ClusterDown,
            "CLUSTERDOWN",
        )));
        assert_eq!(err.kind(), ErrorKind::TopologyNotReady);
    }

    #[test]
    fn generic_response_errors_are_internal() {
        let err = classify(RedisError::from((
            RedisErrorKind::ResponseError,
            "ERR",
            "wrong number of arguments".to_string(),
        )));
        assert_eq!(err.kind(), ErrorKind::StoreInternal);
    }
}
