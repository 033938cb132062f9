use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, info, warn};

use crate::error::{GlassesError, Result, TransportError};
use crate::presets::{BreathingPattern, Preset, SessionParams};
use crate::protocol::{
    encode_breathing, encode_brightness, encode_duration, encode_hold, encode_opacity,
    encode_resume, encode_sleep, encode_strobe, DEFAULT_CONNECT_TIMEOUT, DEFAULT_SCAN_TIMEOUT,
    DEVICE_NAME, UNKNOWN_RSSI,
};
use crate::transport::{Advertisement, Link, Transport};
use crate::types::{ScanResult, SessionState};

// ── Scanning ──────────────────────────────────────────────────────────────────

/// Keep advertisements whose name contains [`DEVICE_NAME`], strongest first.
///
/// Nameless and non-matching advertisements are dropped silently.  The sort
/// is stable, so equal RSSI keeps discovery order.
pub fn filter_advertisements(advertisements: Vec<Advertisement>) -> Vec<ScanResult> {
    let mut found: Vec<ScanResult> = advertisements
        .into_iter()
        .filter_map(|ad| {
            let name = ad.name?;
            if !name.contains(DEVICE_NAME) {
                debug!("scan: ignoring {name} ({})", ad.address);
                return None;
            }
            Some(ScanResult {
                name,
                address: ad.address,
                rssi: ad.rssi.unwrap_or(UNKNOWN_RSSI),
            })
        })
        .collect();
    found.sort_by(|a, b| b.rssi.cmp(&a.rssi));
    found
}

// ── GlassesConfig ─────────────────────────────────────────────────────────────

/// Configuration for [`Glasses`].
#[derive(Debug, Clone)]
pub struct GlassesConfig {
    /// Address of a specific device.  When `None`, [`Glasses::connect`] scans
    /// and picks the strongest advertiser.  Default: `None`.
    pub address: Option<String>,
    /// Deadline used by [`Glasses::with_session`].  Default: 10 s.
    pub connect_timeout: Duration,
    /// Scan window used to find a device when no address is bound.
    /// Default: 5 s.
    pub scan_timeout: Duration,
}

impl Default for GlassesConfig {
    fn default() -> Self {
        Self {
            address: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
        }
    }
}

// ── Glasses ───────────────────────────────────────────────────────────────────

/// A session with one pair of EDGE glasses.
///
/// Operations take `&mut self`, so at most one write is ever in flight.
/// Each control method encodes a frame with [`crate::protocol`] and awaits
/// the confirmed write before returning.
///
/// ```no_run
/// use edge_glasses::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let transport = BtleplugTransport::new().await?;
/// let mut glasses = Glasses::new(transport, GlassesConfig::default());
/// glasses
///     .with_session(|g| Box::pin(async move { g.session_relax(20).await }))
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Glasses<T: Transport> {
    transport: T,
    config: GlassesConfig,
    address: Option<String>,
    link: Option<T::Link>,
    state: SessionState,
}

impl<T: Transport> Glasses<T> {
    pub fn new(transport: T, config: GlassesConfig) -> Self {
        let address = config.address.clone();
        Self {
            transport,
            config,
            address,
            link: None,
            state: SessionState::Disconnected,
        }
    }

    /// Scan for EDGE glasses for `timeout`.
    ///
    /// Returns an empty list, not an error, when nothing matches.
    pub async fn scan(transport: &T, timeout: Duration) -> Result<Vec<ScanResult>> {
        let advertisements = transport
            .scan(timeout)
            .await
            .map_err(GlassesError::ScanFailed)?;
        let found = filter_advertisements(advertisements);
        for d in &found {
            info!("scan: found {d}");
        }
        info!("scan: {} device(s) found", found.len());
        Ok(found)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected && self.link.is_some()
    }

    /// The bound device address, if any.  Set by the config or by the scan
    /// inside [`Glasses::connect`].
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    // ── Connection lifecycle ─────────────────────────────────────────────────

    /// Connect to the bound address, scanning for one first if needed.
    ///
    /// `timeout` bounds the transport connect only; the preceding scan runs
    /// for [`GlassesConfig::scan_timeout`].  Already connected is a no-op.
    pub async fn connect(&mut self, timeout: Duration) -> Result<()> {
        if self.is_connected() {
            debug!("connect: already connected");
            return Ok(());
        }

        let address = match self.address.clone() {
            Some(address) => address,
            None => {
                let devices = Self::scan(&self.transport, self.config.scan_timeout).await?;
                let first = devices.into_iter().next().ok_or(GlassesError::DeviceNotFound)?;
                info!("connect: picked {first}");
                self.address = Some(first.address.clone());
                first.address
            }
        };

        self.state = SessionState::Connecting;
        info!("Connecting to {address} (timeout: {:.1} s) …", timeout.as_secs_f64());

        let outcome = tokio::time::timeout(timeout, self.transport.connect(&address)).await;
        match outcome {
            Ok(Ok(link)) => {
                self.link = Some(link);
                self.state = SessionState::Connected;
                info!("Connected to {address}");
                Ok(())
            }
            Ok(Err(TransportError::Timeout)) | Err(_) => {
                self.state = SessionState::Disconnected;
                Err(GlassesError::Timeout(timeout))
            }
            Ok(Err(e)) => {
                self.state = SessionState::Disconnected;
                Err(GlassesError::ConnectionFailed(e))
            }
        }
    }

    /// Best-effort disconnect.  Safe to call repeatedly; transport errors are
    /// logged and dropped, and the session always ends up disconnected.
    pub async fn disconnect(&mut self) {
        if let Some(link) = self.link.take() {
            match link.disconnect().await {
                Ok(()) => info!("Disconnected."),
                Err(e) => warn!("disconnect error ignored: {e}"),
            }
        }
        self.state = SessionState::Disconnected;
    }

    /// Connect, run `f`, then disconnect on every exit path.
    ///
    /// The disconnect runs after a normal return, after `f` returns an error,
    /// and after `f` panics (the panic is resumed once the link is released).
    pub async fn with_session<R, F>(&mut self, f: F) -> Result<R>
    where
        F: for<'a> FnOnce(&'a mut Self) -> BoxFuture<'a, Result<R>>,
    {
        let timeout = self.config.connect_timeout;
        self.connect(timeout).await?;
        let outcome = AssertUnwindSafe(f(self)).catch_unwind().await;
        self.disconnect().await;
        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    // ── Raw write ────────────────────────────────────────────────────────────

    /// Write one raw frame to the control characteristic and await the
    /// device's confirmation.
    pub async fn write(&mut self, frame: &[u8]) -> Result<()> {
        let link = match (&self.link, self.state) {
            (Some(link), SessionState::Connected) => link,
            _ => return Err(GlassesError::NotConnected),
        };
        debug!("write: {frame:02x?}");
        link.write(frame).await.map_err(|e| {
            warn!("write {frame:02x?} failed: {e}");
            GlassesError::CommandFailed(e)
        })
    }

    // ── Simple control ───────────────────────────────────────────────────────

    /// Static lens opacity, `0` clear to `255` fully dark.  Stops any
    /// running session.
    pub async fn set_opacity(&mut self, value: i32) -> Result<()> {
        self.write(&encode_opacity(value)).await
    }

    /// Fully clear lenses.
    pub async fn clear(&mut self) -> Result<()> {
        self.set_opacity(0).await
    }

    /// Fully dark lenses.
    pub async fn dark(&mut self) -> Result<()> {
        self.set_opacity(255).await
    }

    // ── Session parameters ───────────────────────────────────────────────────

    /// Strobe range swept linearly over the session (each 1–50 Hz).
    /// Restarts the current session.
    pub async fn set_strobe(&mut self, start_hz: i32, end_hz: i32) -> Result<()> {
        self.write(&encode_strobe(start_hz, end_hz)).await
    }

    /// Maximum brightness, 0–100 %.  Does not restart the session.
    pub async fn set_brightness(&mut self, percent: i32) -> Result<()> {
        self.write(&encode_brightness(percent)).await
    }

    /// Breathing phases in seconds (0.0–25.5 s each, 0.1 s resolution).
    /// Restarts the current session.
    pub async fn set_breathing(&mut self, pattern: BreathingPattern) -> Result<()> {
        let frame = encode_breathing(
            pattern.inhale,
            pattern.hold_in,
            pattern.exhale,
            pattern.hold_out,
        );
        self.write(&frame).await
    }

    /// Session length, 1–60 minutes.  (Re)starts the timed program.
    pub async fn set_duration(&mut self, minutes: i32) -> Result<()> {
        self.write(&encode_duration(minutes)).await
    }

    /// Hold a static duty cycle, 0–100 %.  Stops the program.
    pub async fn hold(&mut self, duty: i32) -> Result<()> {
        self.write(&encode_hold(duty)).await
    }

    /// Resume / restart the timed session.
    pub async fn resume(&mut self) -> Result<()> {
        self.write(&encode_resume()).await
    }

    /// Put the glasses into deep sleep.
    pub async fn sleep(&mut self) -> Result<()> {
        self.write(&encode_sleep()).await
    }

    // ── Composed sessions ────────────────────────────────────────────────────

    /// Configure and start a complete session.
    ///
    /// Writes brightness → breathing → strobe → duration, one at a time.
    /// Not transactional: if a write fails, the frames before it have
    /// already been applied on the device.
    pub async fn start_session(&mut self, params: &SessionParams) -> Result<()> {
        for frame in params.frames() {
            self.write(&frame).await?;
        }
        Ok(())
    }

    /// Start `preset` for `minutes`.
    pub async fn start_preset(&mut self, preset: Preset, minutes: i32) -> Result<()> {
        info!("Starting {preset} session ({minutes} min)");
        self.start_session(&preset.params().with_duration(minutes))
            .await
    }

    /// 10 → 4 Hz strobe, 5 s breathing phases.
    pub async fn session_relax(&mut self, minutes: i32) -> Result<()> {
        self.start_preset(Preset::Relax, minutes).await
    }

    /// 15 → 10 Hz strobe, 3 s / 2 s breathing phases.
    pub async fn session_focus(&mut self, minutes: i32) -> Result<()> {
        self.start_preset(Preset::Focus, minutes).await
    }

    /// 12 → 8 Hz strobe, 4 s breathing phases.
    pub async fn session_meditate(&mut self, minutes: i32) -> Result<()> {
        self.start_preset(Preset::Meditate, minutes).await
    }

    /// 6 → 2 Hz strobe, 6 s breathing phases.  The device sleeps when the
    /// session ends.
    pub async fn session_sleep(&mut self, minutes: i32) -> Result<()> {
        self.start_preset(Preset::Sleep, minutes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ad(name: Option<&str>, address: &str, rssi: Option<i16>) -> Advertisement {
        Advertisement {
            name: name.map(str::to_owned),
            address: address.to_owned(),
            rssi,
        }
    }

    #[test]
    fn filter_keeps_matching_names_strongest_first() {
        let found = filter_advertisements(vec![
            ad(Some("Smart_Glasses"), "far", Some(-70)),
            ad(Some("Heart Rate Strap"), "other", Some(-30)),
            ad(None, "anon", Some(-20)),
            ad(Some("EDGE Smart_Glasses 2"), "near", Some(-40)),
            ad(Some("Smart_Glasses"), "silent", None),
        ]);
        let order: Vec<(&str, i16)> = found.iter().map(|d| (d.address.as_str(), d.rssi)).collect();
        assert_eq!(order, vec![("near", -40), ("far", -70), ("silent", -100)]);
    }

    #[test]
    fn filter_of_nothing_is_empty() {
        assert!(filter_advertisements(vec![]).is_empty());
        assert!(filter_advertisements(vec![ad(Some("Headphones"), "x", Some(-10))]).is_empty());
    }
}
