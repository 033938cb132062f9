//! The capability boundary between a session and the BLE stack.
//!
//! [`crate::glasses_client::Glasses`] only ever talks to a [`Transport`]
//! (scan + connect) and the [`Link`] it hands back (write + disconnect).
//! [`crate::ble::BtleplugTransport`] drives real hardware;
//! [`crate::mock::MockTransport`] records calls in memory for tests.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;

/// A raw BLE advertisement, before any name filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub name: Option<String>,
    pub address: String,
    pub rssi: Option<i16>,
}

/// Discovers peripherals and opens connections to them.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open connection to a single peripheral.
    type Link: Link + 'static;

    /// Listen for advertisements for `timeout` and return everything seen.
    async fn scan(&self, timeout: Duration) -> Result<Vec<Advertisement>, TransportError>;

    /// Connect to the peripheral at `address` and resolve its control
    /// characteristic.
    async fn connect(&self, address: &str) -> Result<Self::Link, TransportError>;
}

/// An open connection.  Dropping it releases the handle.
#[async_trait]
pub trait Link: Send + Sync {
    /// Confirmed (write-with-response) write to the control characteristic.
    async fn write(&self, frame: &[u8]) -> Result<(), TransportError>;

    async fn disconnect(&self) -> Result<(), TransportError>;
}
