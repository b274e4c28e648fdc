//! Error types shared by the companion crates.

use thiserror::Error;

/// Transport or query failure against the connectivity provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectivityError {
    /// The provider (or Bluetooth) is not available.
    #[error("connectivity unavailable: {0}")]
    Unavailable(String),

    /// A status or install query failed.
    #[error("query failed: {0}")]
    Query(String),

    /// Sending a message failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The provider did not answer in time.
    #[error("operation timed out")]
    Timeout,
}

/// Failure building a device-bound payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// No readings are available to push.
    #[error("no readings available")]
    NoData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ConnectivityError::Query("app status".into());
        assert_eq!(err.to_string(), "query failed: app status");
        assert_eq!(PayloadError::NoData.to_string(), "no readings available");
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ConnectivityError>();
        assert_send_sync::<PayloadError>();
    }
}
