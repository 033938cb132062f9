use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

/// Failures reported by a [`crate::transport::Transport`] implementation.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("no Bluetooth adapter found")]
    NoAdapter,

    #[error("device {0} is not known to the adapter")]
    UnknownDevice(String),

    #[error("characteristic {0} not found")]
    CharacteristicNotFound(Uuid),

    #[error("transport operation timed out")]
    Timeout,

    #[error(transparent)]
    Ble(btleplug::Error),

    #[error("{0}")]
    Other(String),
}

impl From<btleplug::Error> for TransportError {
    fn from(err: btleplug::Error) -> Self {
        match err {
            btleplug::Error::TimedOut(_) => TransportError::Timeout,
            other => TransportError::Ble(other),
        }
    }
}

/// Error type for every session and control operation.
///
/// None of these are retried internally; each is surfaced to the caller as
/// soon as it happens.
#[derive(Error, Debug)]
pub enum GlassesError {
    #[error("no EDGE glasses found, is the device powered on?")]
    DeviceNotFound,

    #[error("failed to connect: {0}")]
    ConnectionFailed(#[source] TransportError),

    #[error("connection timed out after {0:?}")]
    Timeout(Duration),

    #[error("not connected, call connect() first")]
    NotConnected,

    #[error("command failed: {0}")]
    CommandFailed(#[source] TransportError),

    #[error("scan failed: {0}")]
    ScanFailed(#[source] TransportError),
}

pub type Result<T> = std::result::Result<T, GlassesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glasses_error_display() {
        assert_eq!(
            GlassesError::NotConnected.to_string(),
            "not connected, call connect() first"
        );
        assert_eq!(
            GlassesError::Timeout(Duration::from_secs(10)).to_string(),
            "connection timed out after 10s"
        );
        let err = GlassesError::CommandFailed(TransportError::Other("gatt write rejected".into()));
        assert_eq!(err.to_string(), "command failed: gatt write rejected");
    }

    #[test]
    fn test_btleplug_timeout_maps_to_transport_timeout() {
        let err = TransportError::from(btleplug::Error::TimedOut(Duration::from_secs(1)));
        assert!(matches!(err, TransportError::Timeout));

        let err = TransportError::from(btleplug::Error::NotConnected);
        assert!(matches!(err, TransportError::Ble(btleplug::Error::NotConnected)));
    }
}
