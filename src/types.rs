use std::fmt;

/// An EDGE glasses device discovered during a BLE scan.
///
/// Returned by [`crate::glasses_client::Glasses::scan`], strongest signal
/// first.  Pass `address` in [`crate::glasses_client::GlassesConfig`] to
/// connect to this particular device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    /// Advertised local name (contains `"Smart_Glasses"`).
    pub name: String,
    /// Platform BLE identifier.
    /// • macOS / Windows — a UUID string
    /// • Linux — a Bluetooth MAC address (`AA:BB:CC:DD:EE:FF`)
    pub address: String,
    /// Received signal strength in dBm; `-100` when the advertisement did not
    /// carry one.
    pub rssi: i16,
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) RSSI: {}", self.name, self.address, self.rssi)
    }
}

/// Connection state of a [`crate::glasses_client::Glasses`] session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    /// A transport-level connect is in flight.
    Connecting,
    Connected,
}
