//! [`Transport`] implementation backed by `btleplug`.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::future::{self, BoxFuture};
use futures::{FutureExt, Stream, StreamExt};
use log::{debug, info};

use crate::error::TransportError;
use crate::protocol::CONTROL_CHARACTERISTIC;
use crate::transport::{Advertisement, Link, Transport};

/// How often [`BtleplugTransport::connect`] re-checks the adapter's
/// peripheral list while waiting for an unseen address to advertise.
const PERIPHERAL_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Upper bound on the CoreBluetooth power-on wait in [`BtleplugTransport::new`].
#[cfg(target_os = "macos")]
const POWER_ON_PATIENCE: Duration = Duration::from_secs(3);

// ── BtleplugTransport ─────────────────────────────────────────────────────────

/// BLE transport on the first adapter reported by the platform.
#[derive(Clone)]
pub struct BtleplugTransport {
    adapter: Adapter,
}

impl BtleplugTransport {
    /// Open the first Bluetooth adapter.
    ///
    /// On macOS this also waits (up to 3 s) for CoreBluetooth to reach the
    /// *poweredOn* state, since scanning earlier is a silent no-op.
    pub async fn new() -> Result<Self, TransportError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(TransportError::NoAdapter)?;

        #[cfg(target_os = "macos")]
        wait_powered_on(&adapter, POWER_ON_PATIENCE).await;

        Ok(Self { adapter })
    }

    /// Start scanning and return a guard that stops the scan when run or
    /// dropped.
    async fn start_scan(&self) -> Result<DeferredCleanup, TransportError> {
        self.adapter.start_scan(ScanFilter::default()).await?;
        let adapter = self.adapter.clone();
        Ok(DeferredCleanup::new(async move {
            adapter.stop_scan().await.ok();
        }))
    }

    /// Poll the adapter until a peripheral with id `address` shows up.
    ///
    /// Runs until found; the session bounds it with the connect deadline.
    async fn find_peripheral(&self, address: &str) -> Result<Peripheral, TransportError> {
        if let Some(p) = self.lookup(address).await? {
            return Ok(p);
        }

        debug!("{address} not cached by the adapter, scanning for it");
        let scanning = self.start_scan().await?;
        let found = loop {
            match self.lookup(address).await {
                Ok(Some(p)) => break Ok(p),
                Ok(None) => tokio::time::sleep(PERIPHERAL_POLL_INTERVAL).await,
                Err(e) => break Err(e),
            }
        };
        scanning.run().await;
        found
    }

    async fn lookup(&self, address: &str) -> Result<Option<Peripheral>, TransportError> {
        Ok(self
            .adapter
            .peripherals()
            .await?
            .into_iter()
            .find(|p| p.id().to_string() == address))
    }

    /// Connect `peripheral` and resolve the control characteristic.
    async fn open_link(&self, peripheral: &Peripheral) -> Result<Characteristic, TransportError> {
        peripheral.connect().await?;

        // BlueZ reports the link as up before the remote GATT cache is
        // populated; discovering too early returns an empty service set.
        #[cfg(target_os = "linux")]
        tokio::time::sleep(Duration::from_millis(600)).await;

        peripheral.discover_services().await?;

        peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == CONTROL_CHARACTERISTIC)
            .ok_or(TransportError::CharacteristicNotFound(CONTROL_CHARACTERISTIC))
    }
}

#[cfg(target_os = "macos")]
async fn wait_powered_on(adapter: &Adapter, patience: Duration) {
    use btleplug::api::CentralState;
    use log::warn;

    let powered = tokio::time::timeout(patience, async {
        loop {
            match adapter.adapter_state().await {
                Ok(CentralState::PoweredOn) => return true,
                Ok(state) => debug!("CoreBluetooth state {state:?}, polling"),
                Err(e) => {
                    warn!("CoreBluetooth state unavailable: {e}");
                    return false;
                }
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    })
    .await;

    match powered {
        Ok(true) => info!("adapter powered on"),
        Ok(false) => {}
        Err(_) => warn!(
            "adapter not powered on after {:.1} s, continuing",
            patience.as_secs_f64()
        ),
    }
    // The delegate needs a moment after the state change before scans take.
    tokio::time::sleep(Duration::from_millis(300)).await;
}

fn advertiser(event: CentralEvent) -> Option<PeripheralId> {
    match event {
        CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => Some(id),
        _ => None,
    }
}

/// Distinct ids yielded by `events` within `window`, in first-seen order.
async fn collect_advertisers<S, I>(events: S, window: Duration) -> Vec<I>
where
    S: Stream<Item = I>,
    I: PartialEq,
{
    let mut events = std::pin::pin!(events);
    let mut seen = Vec::new();
    let _ = tokio::time::timeout(window, async {
        while let Some(id) = events.next().await {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }
    })
    .await;
    seen
}

#[async_trait]
impl Transport for BtleplugTransport {
    type Link = BtleplugLink;

    async fn scan(&self, timeout: Duration) -> Result<Vec<Advertisement>, TransportError> {
        info!("scan: listening for {:.1} s …", timeout.as_secs_f64());
        // Subscribe first so no advertisement between start and listen is lost.
        let events = self.adapter.events().await?;
        let scanning = self.start_scan().await?;
        let ids = collect_advertisers(
            events.filter_map(|event| future::ready(advertiser(event))),
            timeout,
        )
        .await;
        scanning.run().await;

        let mut seen = vec![];
        for id in ids {
            let Ok(p) = self.adapter.peripheral(&id).await else {
                continue;
            };
            if let Ok(Some(props)) = p.properties().await {
                seen.push(Advertisement {
                    name: props.local_name,
                    address: p.id().to_string(),
                    rssi: props.rssi,
                });
            }
        }
        debug!("scan: {} advertisement(s) seen", seen.len());
        Ok(seen)
    }

    async fn connect(&self, address: &str) -> Result<BtleplugLink, TransportError> {
        let peripheral = self.find_peripheral(address).await?;

        // Armed before `connect()` so a deadline that fires mid-connect still
        // tears the link down.
        let link_guard = {
            let peripheral = peripheral.clone();
            DeferredCleanup::new(async move {
                peripheral.disconnect().await.ok();
            })
        };

        match self.open_link(&peripheral).await {
            Ok(control_char) => {
                link_guard.disarm();
                info!("Connected and services discovered: {address}");
                Ok(BtleplugLink {
                    peripheral,
                    control_char,
                })
            }
            Err(e) => {
                debug!("connect to {address} failed ({e}), releasing link");
                link_guard.run().await;
                Err(e)
            }
        }
    }
}

// ── DeferredCleanup ───────────────────────────────────────────────────────────

/// A teardown future that runs exactly once: awaited via [`run`], skipped via
/// [`disarm`], or spawned onto the runtime if the guard is dropped while still
/// armed (e.g. the owning future was cancelled by a timeout).
///
/// [`run`]: DeferredCleanup::run
/// [`disarm`]: DeferredCleanup::disarm
struct DeferredCleanup(Option<BoxFuture<'static, ()>>);

impl DeferredCleanup {
    fn new(cleanup: impl Future<Output = ()> + Send + 'static) -> Self {
        Self(Some(cleanup.boxed()))
    }

    async fn run(mut self) {
        if let Some(cleanup) = self.0.take() {
            cleanup.await;
        }
    }

    fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for DeferredCleanup {
    fn drop(&mut self) {
        let Some(cleanup) = self.0.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(cleanup);
            }
            Err(_) => log::warn!("no runtime to run BLE cleanup on, skipping"),
        }
    }
}

// ── BtleplugLink ──────────────────────────────────────────────────────────────

/// An open `btleplug` connection with its resolved control characteristic.
pub struct BtleplugLink {
    peripheral: Peripheral,
    control_char: Characteristic,
}

#[async_trait]
impl Link for BtleplugLink {
    async fn write(&self, frame: &[u8]) -> Result<(), TransportError> {
        self.peripheral
            .write(&self.control_char, frame, WriteType::WithResponse)
            .await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        self.peripheral.disconnect().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::channel::oneshot;
    use futures::stream;

    fn signalling_cleanup() -> (DeferredCleanup, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let cleanup = DeferredCleanup::new(async move {
            let _ = tx.send(());
        });
        (cleanup, rx)
    }

    #[tokio::test]
    async fn cleanup_runs_when_awaited() {
        let (cleanup, rx) = signalling_cleanup();
        cleanup.run().await;
        assert_eq!(rx.await, Ok(()));
    }

    #[tokio::test]
    async fn disarmed_cleanup_never_runs() {
        let (cleanup, rx) = signalling_cleanup();
        cleanup.disarm();
        assert!(rx.await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cleanup_runs_when_owner_is_cancelled() {
        let (cleanup, rx) = signalling_cleanup();
        let cancelled = tokio::time::timeout(Duration::from_secs(1), async move {
            let _guard = cleanup;
            future::pending::<()>().await
        })
        .await;
        assert!(cancelled.is_err());
        assert_eq!(rx.await, Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn advertisers_are_deduplicated_in_first_seen_order() {
        let events = stream::iter([3, 1, 3, 2, 1]).chain(stream::pending());
        let ids = collect_advertisers(events, Duration::from_secs(5)).await;
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn advertisers_after_the_window_are_ignored() {
        let late = stream::once(async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            2
        });
        let events = stream::iter([1]).chain(late);
        let ids = collect_advertisers(events, Duration::from_secs(5)).await;
        assert_eq!(ids, vec![1]);
    }
}
