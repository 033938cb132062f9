//! # edge-glasses
//!
//! Async Rust client for EDGE smart glasses (LCD shutter lenses) over
//! Bluetooth Low Energy.
//!
//! The glasses expose one writable GATT characteristic.  This crate encodes
//! the short command frames it understands and manages the connection that
//! carries them:
//!
//! | Layer | API |
//! |---|---|
//! | raw frames | [`glasses_client::Glasses::write`] |
//! | parameters | opacity, strobe, brightness, breathing, duration, hold, resume, sleep |
//! | presets | [`presets::Preset`]: relax, focus, meditate, sleep |
//!
//! ## Quick start
//!
//! ```no_run
//! use edge_glasses::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let transport = BtleplugTransport::new().await?;
//!     let mut glasses = Glasses::new(transport, GlassesConfig::default());
//!
//!     glasses.connect(Duration::from_secs(10)).await?;
//!     glasses.set_opacity(128).await?;
//!     glasses.session_meditate(10).await?;
//!     glasses.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! Values outside a command's range are clamped, never rejected, so a
//! biosignal feedback loop can stream raw values straight into
//! [`glasses_client::Glasses::set_opacity`].
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`prelude`] | One-line glob import of the most commonly needed types |
//! | [`glasses_client`] | Scanning, the connection state machine, and the control API |
//! | [`protocol`] | GATT UUIDs, opcodes, and the pure frame encoders |
//! | [`presets`] | Session parameter bundles and the four named presets |
//! | [`transport`] | The `Transport` / `Link` traits a session runs on |
//! | [`ble`] | `btleplug` transport for real hardware |
//! | [`mock`] | In-memory transport for tests |
//! | [`types`] | Scan results and session state |
//! | [`error`] | Error types |

pub mod ble;
pub mod error;
pub mod glasses_client;
pub mod mock;
pub mod presets;
pub mod protocol;
pub mod transport;
pub mod types;

// ── Prelude ───────────────────────────────────────────────────────────────────

/// Convenience re-exports for downstream crates.
pub mod prelude {
    pub use std::time::Duration;

    // ── Client ────────────────────────────────────────────────────────────────
    pub use crate::ble::BtleplugTransport;
    pub use crate::glasses_client::{Glasses, GlassesConfig};
    pub use crate::transport::{Link, Transport};

    // ── Data types ────────────────────────────────────────────────────────────
    pub use crate::error::{GlassesError, TransportError};
    pub use crate::presets::{BreathingPattern, Preset, SessionParams};
    pub use crate::types::{ScanResult, SessionState};

    // ── Protocol constants ────────────────────────────────────────────────────
    pub use crate::protocol::{CONTROL_CHARACTERISTIC, DEVICE_NAME, SERVICE_UUID};
}
