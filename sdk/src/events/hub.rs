//! # Event Hub
//!
//! Connects to a peer's event endpoint and turns the raw event stream into
//! per-transaction notifications. The lifecycle:
//!
//! ```text
//! Disconnected ──connect()──► Connecting ──stream open──► Connected
//!      ▲                           │                          │
//!      └──────── failure ──────────┘     disconnect(), EOS,   │
//!      └───────────────────────────────── stream error ───────┘
//! ```
//!
//! One reader task per connection. For each block it decodes the
//! transaction id of every envelope, fires and forgets the callback
//! registered for that id, hands chaincode events to matching chaincode
//! registrants, and finally passes the block to the block listeners.
//! Rejections go to the block listeners without a block, and to the
//! transaction callback when the rejection names its transaction.
//!
//! Registrant maps sit behind `parking_lot` locks. Callbacks are always
//! collected first and invoked after the lock is released, so a callback may
//! register or unregister without deadlocking.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::source::{EventSource, EventStream};
use crate::config::DEFAULT_EVENT_TIMEOUT;
use crate::error::{SdkError, SdkResult};
use crate::metrics::SdkMetrics;
use crate::protos::{
    envelope_chaincode_events, envelope_tx_id, Block, ChaincodeEvent, Event, EventType, Interest,
    Rejection,
};
use crate::transport::TransportError;

/// Receives every block, or `(None, Some(error))` for a rejection.
pub type BlockCallback = Arc<dyn Fn(Option<&Block>, Option<&str>) + Send + Sync>;

/// Fires once for a transaction id: `Ok` when it appears in a block, `Err`
/// with the rejection message otherwise.
pub type TxCallback = Box<dyn FnOnce(&str, Result<(), String>) + Send>;

pub type ChaincodeCallback = Arc<dyn Fn(&ChaincodeEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubState {
    Disconnected,
    Connecting,
    Connected,
}

/// Handle returned by [`EventHub::register_chaincode_event`].
pub struct ChaincodeRegistration {
    pub chaincode_id: String,
    /// Exact event name, `""`/`"*"` for any name, or `prefix*`.
    pub event_name_filter: String,
    callback: ChaincodeCallback,
}

impl ChaincodeRegistration {
    fn matches(&self, event: &ChaincodeEvent) -> bool {
        self.chaincode_id == event.chaincode_id
            && filter_matches(&self.event_name_filter, &event.event_name)
    }
}

impl fmt::Debug for ChaincodeRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChaincodeRegistration")
            .field("chaincode_id", &self.chaincode_id)
            .field("event_name_filter", &self.event_name_filter)
            .finish()
    }
}

fn filter_matches(filter: &str, name: &str) -> bool {
    if filter.is_empty() || filter == "*" {
        return true;
    }
    match filter.strip_suffix('*') {
        Some(prefix) => name.starts_with(prefix),
        None => filter == name,
    }
}

struct HubInner {
    peer_addr: RwLock<String>,
    source: RwLock<Option<Arc<dyn EventSource>>>,
    connect_timeout: RwLock<Duration>,
    state: RwLock<HubState>,
    /// Bumped on every connect/disconnect so a stale reader cannot mark a
    /// newer connection as disconnected.
    generation: AtomicU64,
    reader: Mutex<Option<JoinHandle<()>>>,
    next_block_id: AtomicU64,
    block_registrants: RwLock<Vec<(u64, BlockCallback)>>,
    chaincode_registrants: RwLock<HashMap<String, Vec<Arc<ChaincodeRegistration>>>>,
    tx_registrants: Mutex<HashMap<String, TxCallback>>,
    metrics: Option<SdkMetrics>,
}

/// Shared handle to one event subscription. Clones refer to the same hub.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A hub that counts delivered transaction events.
    pub fn with_metrics(metrics: SdkMetrics) -> Self {
        Self::build(Some(metrics))
    }

    fn build(metrics: Option<SdkMetrics>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                peer_addr: RwLock::new(String::new()),
                source: RwLock::new(None),
                connect_timeout: RwLock::new(DEFAULT_EVENT_TIMEOUT),
                state: RwLock::new(HubState::Disconnected),
                generation: AtomicU64::new(0),
                reader: Mutex::new(None),
                next_block_id: AtomicU64::new(1),
                block_registrants: RwLock::new(Vec::new()),
                chaincode_registrants: RwLock::new(HashMap::new()),
                tx_registrants: Mutex::new(HashMap::new()),
                metrics,
            }),
        }
    }

    pub fn set_peer_addr(&self, addr: impl Into<String>) {
        *self.inner.peer_addr.write() = addr.into();
    }

    pub fn peer_addr(&self) -> String {
        self.inner.peer_addr.read().clone()
    }

    pub fn set_event_source(&self, source: Arc<dyn EventSource>) {
        *self.inner.source.write() = Some(source);
    }

    pub fn set_connect_timeout(&self, timeout: Duration) {
        *self.inner.connect_timeout.write() = timeout;
    }

    pub fn state(&self) -> HubState {
        *self.inner.state.read()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == HubState::Connected
    }

    // -- Lifecycle ------------------------------------------------------------

    /// Opens the subscription (block and rejection events) and starts the
    /// reader task. Connecting an already connected hub is a no-op.
    pub async fn connect(&self) -> SdkResult<()> {
        let addr = self.peer_addr();
        if addr.is_empty() {
            return Err(SdkError::Configuration(
                "eventHub.peerAddr is empty".to_string(),
            ));
        }
        let source = self.inner.source.read().clone().ok_or_else(|| {
            SdkError::Configuration("eventHub has no event source".to_string())
        })?;

        let generation = {
            let mut state = self.inner.state.write();
            match *state {
                HubState::Connected => return Ok(()),
                HubState::Connecting => {
                    return Err(SdkError::Configuration(
                        "eventHub connection already in progress".to_string(),
                    ))
                }
                HubState::Disconnected => *state = HubState::Connecting,
            }
            self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        let interests = vec![
            Interest::of(EventType::Block),
            Interest::of(EventType::Rejection),
        ];
        let limit = *self.inner.connect_timeout.read();
        let opened = match tokio::time::timeout(limit, source.connect(interests)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(limit)),
        };
        let stream = match opened {
            Ok(stream) => stream,
            Err(source) => {
                *self.inner.state.write() = HubState::Disconnected;
                return Err(SdkError::Transport {
                    target: addr,
                    source,
                });
            }
        };

        {
            let mut state = self.inner.state.write();
            if self.inner.generation.load(Ordering::SeqCst) != generation {
                tracing::info!(peer = %addr, "event hub disconnected while connecting");
                return Err(SdkError::Configuration(
                    "eventHub disconnected while connecting".into(),
                ));
            }
            *state = HubState::Connected;
            // The reader handle is stored before the state lock is released.
            let handle = tokio::spawn(run_reader(Arc::clone(&self.inner), stream, generation));
            if let Some(previous) = self.inner.reader.lock().replace(handle) {
                previous.abort();
            }
        }

        tracing::info!(peer = %addr, "event hub connected");
        Ok(())
    }

    /// Stops the reader task. Registered callbacks are kept.
    pub fn disconnect(&self) {
        {
            let mut state = self.inner.state.write();
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            *state = HubState::Disconnected;
        }
        if let Some(handle) = self.inner.reader.lock().take() {
            handle.abort();
        }
        tracing::info!(peer = %self.peer_addr(), "event hub disconnected");
    }

    // -- Registration ---------------------------------------------------------

    /// Adds a block listener, returning an id for unregistering. Accepted in
    /// any state.
    pub fn register_block_event(&self, callback: BlockCallback) -> u64 {
        let id = self.inner.next_block_id.fetch_add(1, Ordering::Relaxed);
        self.inner.block_registrants.write().push((id, callback));
        id
    }

    pub fn unregister_block_event(&self, id: u64) -> bool {
        let mut listeners = self.inner.block_registrants.write();
        let before = listeners.len();
        listeners.retain(|(i, _)| *i != id);
        listeners.len() != before
    }

    /// Registers interest in chaincode events. `None` while not connected.
    pub fn register_chaincode_event(
        &self,
        chaincode_id: &str,
        event_name_filter: &str,
        callback: ChaincodeCallback,
    ) -> Option<Arc<ChaincodeRegistration>> {
        if !self.is_connected() {
            return None;
        }
        let registration = Arc::new(ChaincodeRegistration {
            chaincode_id: chaincode_id.to_string(),
            event_name_filter: event_name_filter.to_string(),
            callback,
        });
        self.inner
            .chaincode_registrants
            .write()
            .entry(chaincode_id.to_string())
            .or_default()
            .push(Arc::clone(&registration));
        Some(registration)
    }

    /// Removes every registration for the same chaincode and filter.
    pub fn unregister_chaincode_event(&self, registration: &ChaincodeRegistration) {
        if !self.is_connected() {
            return;
        }
        let mut registrants = self.inner.chaincode_registrants.write();
        if let Some(list) = registrants.get_mut(&registration.chaincode_id) {
            list.retain(|r| r.event_name_filter != registration.event_name_filter);
            if list.is_empty() {
                registrants.remove(&registration.chaincode_id);
            }
        }
    }

    /// Registers a one-shot callback for `tx_id`, replacing any earlier one.
    /// Returns `false` (and drops the callback) while not connected.
    pub fn register_tx_event(&self, tx_id: &str, callback: TxCallback) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.inner
            .tx_registrants
            .lock()
            .insert(tx_id.to_string(), callback);
        true
    }

    pub fn unregister_tx_event(&self, tx_id: &str) -> bool {
        if !self.is_connected() {
            return false;
        }
        self.inner.tx_registrants.lock().remove(tx_id).is_some()
    }

    /// Channel flavour of [`register_tx_event`](Self::register_tx_event).
    pub fn watch_tx(&self, tx_id: &str) -> Option<oneshot::Receiver<Result<(), String>>> {
        let (tx, rx) = oneshot::channel();
        let registered = self.register_tx_event(
            tx_id,
            Box::new(move |_, outcome| {
                let _ = tx.send(outcome);
            }),
        );
        registered.then_some(rx)
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

async fn run_reader(inner: Arc<HubInner>, mut stream: Box<dyn EventStream>, generation: u64) {
    loop {
        match stream.recv().await {
            Ok(Some(_)) if inner.generation.load(Ordering::SeqCst) != generation => break,
            Ok(Some(event)) => inner.dispatch(event),
            Ok(None) => {
                tracing::info!("event stream closed by peer");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "event stream failed");
                break;
            }
        }
    }

    let mut state = inner.state.write();
    if inner.generation.load(Ordering::SeqCst) == generation {
        *state = HubState::Disconnected;
    }
}

impl HubInner {
    fn dispatch(&self, event: Event) {
        match event {
            Event::Block(block) => self.on_block(&block),
            Event::Rejection(rejection) => self.on_rejection(rejection),
            Event::Chaincode(event) => self.on_chaincode_event(&event),
            Event::Register(_) => tracing::warn!("ignoring register frame from event source"),
        }
    }

    fn on_block(&self, block: &Block) {
        for envelope in &block.data.data {
            match envelope_tx_id(envelope) {
                Ok(tx_id) => self.notify_tx(&tx_id, Ok(())),
                Err(e) => {
                    tracing::warn!(block = block.header.number, error = %e, "undecodable envelope in block");
                    continue;
                }
            }
            match envelope_chaincode_events(envelope) {
                Ok(events) => events.iter().for_each(|e| self.on_chaincode_event(e)),
                Err(e) => tracing::debug!(error = %e, "no chaincode events decoded"),
            }
        }

        for callback in self.block_listeners() {
            callback(Some(block), None);
        }
    }

    fn on_rejection(&self, rejection: Rejection) {
        tracing::debug!(tx_id = %rejection.tx_id, "transaction rejected");
        for callback in self.block_listeners() {
            callback(None, Some(&rejection.error_msg));
        }
        if !rejection.tx_id.is_empty() {
            self.notify_tx(&rejection.tx_id, Err(rejection.error_msg));
        }
    }

    fn on_chaincode_event(&self, event: &ChaincodeEvent) {
        let matching: Vec<Arc<ChaincodeRegistration>> = self
            .chaincode_registrants
            .read()
            .get(&event.chaincode_id)
            .map(|list| list.iter().filter(|r| r.matches(event)).cloned().collect())
            .unwrap_or_default();
        for registration in matching {
            (registration.callback)(event);
        }
    }

    fn block_listeners(&self) -> Vec<BlockCallback> {
        self.block_registrants
            .read()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect()
    }

    fn notify_tx(&self, tx_id: &str, outcome: Result<(), String>) {
        let callback = self.tx_registrants.lock().remove(tx_id);
        if let Some(callback) = callback {
            if let Some(metrics) = &self.metrics {
                metrics.tx_events_delivered_total.inc();
            }
            callback(tx_id, outcome);
        }
    }
}
