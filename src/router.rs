//! # Message Router
//!
//! ## Purpose
//!
//! Owns the single inbound subscription to the transport, decodes every
//! inbound frame exactly once and demultiplexes the result to either a
//! one-shot, deadline-bounded pending request or to persistent subscribers.
//!
//! ## Dispatch algorithm, per inbound frame
//!
//! 1. Decode via the packet codec. Malformed frames are dropped with a log
//!    line and a stats bump; they never fail an unrelated in-flight
//!    request.
//! 2. Scan the pending-request registry in insertion order and resolve the
//!    first entry whose predicate matches. At most one pending request is
//!    resolved per packet; ties go to the earliest registration.
//! 3. Independently, fan the payload out to every subscription registered
//!    for the packet's message key, in registration order.
//!
//! Frames are processed strictly sequentially, in arrival order, by one
//! spawned dispatch task. Match and deadline expiry are serialized through
//! the registry mutex, so removal is exactly-once whichever path fires
//! first.

use crate::error::{Error, Result};
use crate::message::{InboundMessage, MessageKey};
use crate::packet::{self, Packet};
use crate::transport::Transport;
use bytes::Bytes;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Default deadline for a correlated request/response round trip
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(2000);

type Predicate = Box<dyn Fn(&Packet) -> Option<InboundMessage> + Send>;
type SubscriberFn = Arc<dyn Fn(&[u8]) + Send + Sync>;

struct PendingEntry {
    id: u64,
    predicate: Predicate,
    tx: oneshot::Sender<InboundMessage>,
}

struct SubscriptionEntry {
    id: u64,
    key: MessageKey,
    callback: SubscriberFn,
}

#[derive(Default)]
struct Counters {
    frames_received: AtomicU64,
    frames_dropped: AtomicU64,
    requests_resolved: AtomicU64,
    requests_timed_out: AtomicU64,
    subscribers_notified: AtomicU64,
}

/// Snapshot of router counters, for logs and health reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub requests_resolved: u64,
    pub requests_timed_out: u64,
    pub subscribers_notified: u64,
}

#[derive(Default)]
struct Shared {
    pending: Mutex<Vec<PendingEntry>>,
    subscriptions: Mutex<Vec<SubscriptionEntry>>,
    next_id: AtomicU64,
    disposed: AtomicBool,
    counters: Counters,
}

/// Demultiplexer for the device's single inbound byte stream.
///
/// Constructed once per transport session by the composition root and passed
/// by handle to every command use case; there is no ambient global router.
/// Construction takes the transport's inbound subscription; creating a
/// second router for the same transport would be a second subscription, so
/// don't.
pub struct Router {
    shared: Arc<Shared>,
    dispatch: Mutex<Option<JoinHandle<()>>>,
}

impl Router {
    /// Create the router and start its dispatch task. The one inbound
    /// subscription for this router's entire lifetime is taken here;
    /// there is no separate init step to call twice.
    pub fn new(transport: &dyn Transport) -> Self {
        let inbound = transport.subscribe();
        let shared = Arc::new(Shared::default());
        let handle = tokio::spawn(dispatch_loop(Arc::clone(&shared), inbound));
        Self {
            shared,
            dispatch: Mutex::new(Some(handle)),
        }
    }

    /// Register a one-shot waiter for the first inbound packet matching
    /// `predicate`. Registration is synchronous so callers can install the
    /// waiter *before* transmitting the request, so a fast reply cannot
    /// slip past. Await the returned [`PendingReply`] for the outcome.
    pub fn register(
        &self,
        operation: &'static str,
        predicate: impl Fn(&Packet) -> Option<InboundMessage> + Send + 'static,
        timeout: Duration,
    ) -> PendingReply {
        let (tx, rx) = oneshot::channel();
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);

        // The disposed flag is read under the registry lock and shutdown
        // flips it under the same lock, so a registration either lands
        // before the registry is cleared or is rejected outright. An entry
        // can never slip into a dead router.
        let rejected = {
            let mut pending = self.shared.pending.lock();
            let disposed = self.shared.disposed.load(Ordering::Acquire);
            if !disposed {
                pending.push(PendingEntry {
                    id,
                    predicate: Box::new(predicate),
                    tx,
                });
            }
            disposed
        };

        PendingReply {
            shared: Arc::clone(&self.shared),
            id,
            rx,
            operation,
            timeout,
            rejected,
        }
    }

    /// Convenience wrapper: register and immediately await.
    pub async fn request(
        &self,
        operation: &'static str,
        predicate: impl Fn(&Packet) -> Option<InboundMessage> + Send + 'static,
        timeout: Duration,
    ) -> Result<InboundMessage> {
        self.register(operation, predicate, timeout).wait().await
    }

    /// Register a persistent subscriber for every inbound packet with the
    /// given message key. Delivery follows registration order. The
    /// subscription lives until the returned handle is cancelled or
    /// dropped.
    pub fn subscribe(
        &self,
        key: MessageKey,
        callback: impl Fn(&[u8]) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.shared.subscriptions.lock().push(SubscriptionEntry {
            id,
            key,
            callback: Arc::new(callback),
        });
        SubscriptionHandle {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Counter snapshot.
    pub fn stats(&self) -> RouterStats {
        let c = &self.shared.counters;
        RouterStats {
            frames_received: c.frames_received.load(Ordering::Relaxed),
            frames_dropped: c.frames_dropped.load(Ordering::Relaxed),
            requests_resolved: c.requests_resolved.load(Ordering::Relaxed),
            requests_timed_out: c.requests_timed_out.load(Ordering::Relaxed),
            subscribers_notified: c.subscribers_notified.load(Ordering::Relaxed),
        }
    }

    /// Tear the router down: reject every still-pending request with a
    /// disposed error, drop all subscriptions and cancel the transport
    /// subscription. Idempotent; this is the only global teardown path.
    pub fn shutdown(&self) {
        {
            // Flag and registry change together under the registry lock;
            // see the matching read in `register`. Dropping each sender
            // fails its waiter with a disposed error.
            let mut pending = self.shared.pending.lock();
            if self.shared.disposed.swap(true, Ordering::AcqRel) {
                return;
            }
            pending.clear();
        }
        info!("router shutting down");
        if let Some(handle) = self.dispatch.lock().take() {
            handle.abort();
        }
        self.shared.subscriptions.lock().clear();
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn dispatch_loop(shared: Arc<Shared>, mut inbound: mpsc::Receiver<Bytes>) {
    while let Some(frame) = inbound.recv().await {
        shared
            .counters
            .frames_received
            .fetch_add(1, Ordering::Relaxed);

        let packet = match packet::decode(&frame) {
            Ok(packet) => packet,
            Err(err) => {
                warn!(error = %err, len = frame.len(), "dropping malformed inbound frame");
                shared
                    .counters
                    .frames_dropped
                    .fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };

        resolve_pending(&shared, &packet);
        fan_out(&shared, &packet);
    }
    debug!("inbound stream closed, dispatch loop exiting");
}

/// First-registered-first-served: the earliest matching entry wins and at
/// most one entry resolves per packet. The send happens under the registry
/// lock so a concurrent deadline expiry can never observe the entry gone
/// but the value missing.
fn resolve_pending(shared: &Shared, packet: &Packet) {
    let mut pending = shared.pending.lock();
    let matched = pending
        .iter()
        .enumerate()
        .find_map(|(idx, entry)| (entry.predicate)(packet).map(|msg| (idx, msg)));

    if let Some((idx, msg)) = matched {
        let entry = pending.remove(idx);
        shared
            .counters
            .requests_resolved
            .fetch_add(1, Ordering::Relaxed);
        debug!(key = %packet.key(), "resolving pending request");
        // The waiter may already have given up (future dropped); nothing
        // left to do in that case.
        let _ = entry.tx.send(msg);
    }
}

/// Deliver to every subscriber of the packet's key, in registration order.
/// Callbacks run after the registry lock is released, so a callback may
/// cancel its own (or any other) subscription without deadlocking.
fn fan_out(shared: &Shared, packet: &Packet) {
    let key = packet.key();
    let callbacks: Vec<SubscriberFn> = shared
        .subscriptions
        .lock()
        .iter()
        .filter(|entry| entry.key == key)
        .map(|entry| Arc::clone(&entry.callback))
        .collect();

    if callbacks.is_empty() {
        return;
    }
    shared
        .counters
        .subscribers_notified
        .fetch_add(callbacks.len() as u64, Ordering::Relaxed);
    for callback in callbacks {
        callback(&packet.payload);
    }
}

/// A registered one-shot waiter. Await [`PendingReply::wait`]; dropping it
/// without waiting unregisters the entry.
pub struct PendingReply {
    shared: Arc<Shared>,
    id: u64,
    rx: oneshot::Receiver<InboundMessage>,
    operation: &'static str,
    timeout: Duration,
    rejected: bool,
}

impl PendingReply {
    /// Await the correlated reply or the deadline, whichever comes first.
    ///
    /// Expiry takes the registry lock before deciding: if the entry is
    /// already gone, a match won the race and its result is harvested
    /// instead of reporting a timeout. Removal is exactly-once either way.
    pub async fn wait(mut self) -> Result<InboundMessage> {
        if self.rejected {
            return Err(Error::connection("router disposed"));
        }

        match tokio::time::timeout(self.timeout, &mut self.rx).await {
            Ok(Ok(msg)) => Ok(msg),
            Ok(Err(_)) => Err(Error::connection("router disposed while awaiting reply")),
            Err(_elapsed) => {
                let removed = {
                    let mut pending = self.shared.pending.lock();
                    match pending.iter().position(|entry| entry.id == self.id) {
                        Some(idx) => {
                            pending.remove(idx);
                            true
                        }
                        None => false,
                    }
                };
                if removed {
                    self.shared
                        .counters
                        .requests_timed_out
                        .fetch_add(1, Ordering::Relaxed);
                    warn!(
                        operation = self.operation,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "request deadline expired"
                    );
                    Err(Error::timeout(self.operation, self.timeout, 1))
                } else {
                    // A match fired between expiry and taking the lock;
                    // the value is already in the channel.
                    match self.rx.try_recv() {
                        Ok(msg) => Ok(msg),
                        Err(_) => Err(Error::connection("router disposed while awaiting reply")),
                    }
                }
            }
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        let mut pending = self.shared.pending.lock();
        if let Some(idx) = pending.iter().position(|entry| entry.id == self.id) {
            pending.remove(idx);
        }
    }
}

/// Ownership of a subscription: explicit [`cancel`](Self::cancel) or drop
/// removes the entry. Safe to cancel while a delivery is in progress.
pub struct SubscriptionHandle {
    id: u64,
    shared: Weak<Shared>,
}

impl SubscriptionHandle {
    /// Cancel the subscription now.
    pub fn cancel(self) {
        // Drop does the removal.
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            let mut subscriptions = shared.subscriptions.lock();
            if let Some(idx) = subscriptions.iter().position(|entry| entry.id == self.id) {
                subscriptions.remove(idx);
            }
        }
    }
}
