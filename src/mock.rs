//! In-memory [`Transport`] that records every call.
//!
//! Clones share state, so a test can hand one clone to
//! [`crate::glasses_client::Glasses`] and inspect the other.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::TransportError;
use crate::transport::{Advertisement, Link, Transport};

/// How an injected connect failure presents itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// The transport reports its own timeout.
    Timeout,
    /// Any other transport error.
    Error,
}

impl MockFailure {
    fn into_error(self, what: &str) -> TransportError {
        match self {
            MockFailure::Timeout => TransportError::Timeout,
            MockFailure::Error => TransportError::Other(format!("injected {what} failure")),
        }
    }
}

#[derive(Debug, Default)]
pub struct MockState {
    // ── behaviour ──
    pub advertisements: Vec<Advertisement>,
    pub scan_failure: Option<MockFailure>,
    pub connect_failure: Option<MockFailure>,
    /// Extra time the connect takes before resolving.
    pub connect_delay: Option<Duration>,
    /// Number of writes that succeed before every further write fails.
    pub writes_before_failure: Option<usize>,
    pub disconnect_fails: bool,
    /// The link comes up but connect fails afterwards (e.g. service
    /// discovery), so the transport releases it before returning.
    pub connect_fails_after_link: bool,

    // ── recorded calls ──
    pub scan_calls: Vec<Duration>,
    pub connect_calls: Vec<String>,
    pub writes: Vec<Vec<u8>>,
    pub failed_writes: usize,
    pub disconnect_calls: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that advertises one device named `Smart_Glasses`.
    pub fn with_device(address: &str, rssi: i16) -> Self {
        let mock = Self::new();
        mock.advertise(Some("Smart_Glasses"), address, Some(rssi));
        mock
    }

    pub fn advertise(&self, name: Option<&str>, address: &str, rssi: Option<i16>) {
        self.state().advertisements.push(Advertisement {
            name: name.map(str::to_owned),
            address: address.to_owned(),
            rssi,
        });
    }

    /// Lock the shared state for configuration or inspection.
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state().writes.clone()
    }

    pub fn connect_calls(&self) -> Vec<String> {
        self.state().connect_calls.clone()
    }

    pub fn disconnect_calls(&self) -> usize {
        self.state().disconnect_calls
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Link = MockLink;

    async fn scan(&self, timeout: Duration) -> Result<Vec<Advertisement>, TransportError> {
        let mut state = self.state();
        state.scan_calls.push(timeout);
        if let Some(failure) = state.scan_failure {
            return Err(failure.into_error("scan"));
        }
        Ok(state.advertisements.clone())
    }

    async fn connect(&self, address: &str) -> Result<MockLink, TransportError> {
        let (delay, failure, fails_after_link) = {
            let mut state = self.state();
            state.connect_calls.push(address.to_owned());
            (state.connect_delay, state.connect_failure, state.connect_fails_after_link)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(failure) = failure {
            return Err(failure.into_error("connect"));
        }
        let link = MockLink {
            state: Arc::clone(&self.state),
        };
        if fails_after_link {
            link.disconnect().await.ok();
            return Err(TransportError::Other("injected service discovery failure".into()));
        }
        Ok(link)
    }
}

#[derive(Debug)]
pub struct MockLink {
    state: Arc<Mutex<MockState>>,
}

impl MockLink {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Link for MockLink {
    async fn write(&self, frame: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state();
        if let Some(limit) = state.writes_before_failure {
            if state.writes.len() >= limit {
                state.failed_writes += 1;
                return Err(TransportError::Other("injected write failure".into()));
            }
        }
        state.writes.push(frame.to_vec());
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let mut state = self.state();
        state.disconnect_calls += 1;
        if state.disconnect_fails {
            return Err(TransportError::Other("injected disconnect failure".into()));
        }
        Ok(())
    }
}
