//! Broadcast engine - per-key listener notification
//!
//! Producers only enqueue the key that changed onto a bounded signal queue.
//! A single dispatch thread drains the queue and delivers the *current* value
//! of each signaled key, so bursts on one key coalesce. Listeners are plain
//! blocking callbacks and run on that thread, never on a runtime worker.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use async_channel::{Receiver, Sender, TrySendError};
use contracts::{
    LastValueTable, ListenerError, ListenerHandle, MeasurementKey, MeasurementRecord,
    MeasurementSink,
};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument, trace, warn};

use crate::error::SinkError;

/// Default signal queue capacity
pub const DEFAULT_SIGNAL_CAPACITY: usize = 1000;

const RUNNING: u8 = 0;
const STOPPING: u8 = 1;
const STOPPED: u8 = 2;

/// Dispatch thread lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastState {
    Running,
    Stopping,
    Stopped,
}

/// Broadcast counters
#[derive(Debug, Default)]
pub struct BroadcastStats {
    signaled: AtomicU64,
    coalesced: AtomicU64,
    notified: AtomicU64,
    failures: AtomicU64,
    pruned: AtomicU64,
}

/// Snapshot of [`BroadcastStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastStatsSnapshot {
    /// Keys enqueued
    pub signaled: u64,
    /// Signals dropped because the queue was full
    pub coalesced: u64,
    /// Successful listener invocations
    pub notified: u64,
    /// Failed listener invocations
    pub failures: u64,
    /// Disconnected listeners removed
    pub pruned: u64,
}

impl BroadcastStats {
    pub fn snapshot(&self) -> BroadcastStatsSnapshot {
        BroadcastStatsSnapshot {
            signaled: self.signaled.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            notified: self.notified.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
        }
    }
}

struct BroadcastInner {
    name: String,
    listeners: RwLock<HashMap<MeasurementKey, Vec<ListenerHandle>>>,
    last_values: Arc<LastValueTable>,
    signal_tx: Sender<MeasurementKey>,
    state: AtomicU8,
    stats: BroadcastStats,
}

/// Sink that notifies per-key listeners asynchronously
pub struct BroadcastEngine {
    inner: Arc<BroadcastInner>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl BroadcastEngine {
    /// Create the engine and start its dispatch thread
    ///
    /// `last_values` must be the table the router writes before fanning a
    /// record out.
    ///
    /// # Errors
    /// `SinkCreation` if the dispatch thread cannot be spawned.
    pub fn spawn(last_values: Arc<LastValueTable>, queue_capacity: usize) -> Result<Self, SinkError> {
        let (signal_tx, signal_rx) = async_channel::bounded(queue_capacity.max(1));

        let inner = Arc::new(BroadcastInner {
            name: "broadcast".to_string(),
            listeners: RwLock::new(HashMap::new()),
            last_values,
            signal_tx,
            state: AtomicU8::new(RUNNING),
            stats: BroadcastStats::default(),
        });

        let dispatch_inner = Arc::clone(&inner);
        let dispatcher = thread::Builder::new()
            .name("broadcast-dispatch".into())
            .spawn(move || dispatch_loop(dispatch_inner, signal_rx))
            .map_err(|e| SinkError::sink_creation("broadcast", e.to_string()))?;

        Ok(Self {
            inner,
            dispatcher: Mutex::new(Some(dispatcher)),
        })
    }

    /// Add `listener` for `key`; registering twice has no effect
    #[instrument(name = "broadcast_register", skip(self, listener), fields(key = %key))]
    pub fn register(&self, key: &str, listener: ListenerHandle) {
        let mut listeners = self.inner.listeners.write();
        let handles = listeners.entry(MeasurementKey::from(key)).or_default();
        if !handles.contains(&listener) {
            handles.push(listener);
            debug!(count = handles.len(), "listener registered");
        }
    }

    /// Remove `listener` from `key`; unknown pairs are ignored
    #[instrument(name = "broadcast_unregister", skip(self, listener), fields(key = %key))]
    pub fn unregister(&self, key: &str, listener: &ListenerHandle) {
        if let Some(handles) = self.inner.listeners.write().get_mut(key) {
            handles.retain(|h| h != listener);
            debug!(count = handles.len(), "listener unregistered");
        }
    }

    /// Number of listeners currently registered for `key`
    pub fn listener_count(&self, key: &str) -> usize {
        self.inner
            .listeners
            .read()
            .get(key)
            .map_or(0, Vec::len)
    }

    pub fn state(&self) -> BroadcastState {
        match self.inner.state.load(Ordering::Acquire) {
            RUNNING => BroadcastState::Running,
            STOPPING => BroadcastState::Stopping,
            _ => BroadcastState::Stopped,
        }
    }

    pub fn stats(&self) -> BroadcastStatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Stop and wait for the dispatch thread to exit
    ///
    /// A listener call in progress finishes first.
    #[instrument(name = "broadcast_shutdown", skip(self))]
    pub async fn shutdown(&self) {
        MeasurementSink::stop(self);

        let dispatcher = self.dispatcher.lock().take();
        if let Some(dispatcher) = dispatcher {
            match tokio::task::spawn_blocking(move || dispatcher.join()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => warn!("broadcast dispatch thread panicked"),
                Err(e) => warn!(error = ?e, "failed to join broadcast dispatch thread"),
            }
        }
        self.inner.state.store(STOPPED, Ordering::Release);
    }
}

impl Drop for BroadcastEngine {
    fn drop(&mut self) {
        MeasurementSink::stop(self);
    }
}

impl MeasurementSink for BroadcastEngine {
    fn name(&self) -> &str {
        &self.inner.name
    }

    /// Signal `record.key()` if anyone listens to it
    ///
    /// Returns false when nobody listens or when the signal was coalesced
    /// into an already queued one.
    fn receive(&self, record: &MeasurementRecord) -> bool {
        if self.inner.state.load(Ordering::Acquire) != RUNNING {
            return false;
        }

        let has_listeners = self
            .inner
            .listeners
            .read()
            .get(record.key().as_str())
            .is_some_and(|handles| !handles.is_empty());
        if !has_listeners {
            return false;
        }

        match self.inner.signal_tx.try_send(record.key().clone()) {
            Ok(()) => {
                self.inner.stats.signaled.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(key)) => {
                self.inner.stats.coalesced.fetch_add(1, Ordering::Relaxed);
                observability::record_sink_drop(&self.inner.name);
                trace!(key = %key, "signal queue saturated, coalesced");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    fn stop(&self) {
        if self
            .inner
            .state
            .compare_exchange(RUNNING, STOPPING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            debug!("broadcast engine stopping");
            self.inner.signal_tx.close();
        }
    }

    fn summary(&self) -> String {
        let keys = self.inner.listeners.read().len();
        format!(
            "BroadcastEngine{{keys={}, queued={}, state={:?}}}",
            keys,
            self.inner.signal_tx.len(),
            self.state()
        )
    }
}

#[instrument(name = "broadcast_dispatch_loop", skip_all)]
fn dispatch_loop(inner: Arc<BroadcastInner>, signal_rx: Receiver<MeasurementKey>) {
    info!("broadcast dispatch thread started");

    // Closing the queue wakes the receiver; signals still queued are discarded
    while let Ok(key) = signal_rx.recv_blocking() {
        if inner.state.load(Ordering::Acquire) != RUNNING {
            break;
        }
        inner.dispatch(&key);
    }

    inner.state.store(STOPPED, Ordering::Release);
    info!("broadcast dispatch thread stopped");
}

impl BroadcastInner {
    /// Deliver the current value of `key` to all of its listeners
    fn dispatch(&self, key: &MeasurementKey) {
        let Some(record) = self.last_values.get(key) else {
            return;
        };
        let handles = match self.listeners.read().get(key) {
            Some(handles) if !handles.is_empty() => handles.clone(),
            _ => return,
        };

        let mut disconnected = Vec::new();
        for handle in &handles {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handle.notify(&record)))
                .unwrap_or_else(|_| Err(ListenerError::Failed("listener panicked".to_string())));

            match outcome {
                Ok(()) => {
                    self.stats.notified.fetch_add(1, Ordering::Relaxed);
                    observability::record_notification(key, true);
                }
                Err(ListenerError::Disconnected) => {
                    debug!(key = %key, listener = ?handle, "pruning disconnected listener");
                    disconnected.push(handle.clone());
                }
                Err(ListenerError::Failed(message)) => {
                    self.stats.failures.fetch_add(1, Ordering::Relaxed);
                    observability::record_notification(key, false);
                    let err = SinkError::ListenerInvocationFailed {
                        key: key.to_string(),
                        message,
                    };
                    warn!(error = %err, "listener invocation failed");
                }
            }
        }

        if !disconnected.is_empty() {
            if let Some(handles) = self.listeners.write().get_mut(key) {
                handles.retain(|h| !disconnected.contains(h));
            }
            self.stats
                .pruned
                .fetch_add(disconnected.len() as u64, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listeners::{CallbackListener, ChannelListener};
    use contracts::MeasurementListener;
    use std::time::Duration;
    use tokio::sync::mpsc::UnboundedReceiver;
    use tokio::time::{sleep, timeout, Instant};

    fn route(table: &LastValueTable, engine: &BroadcastEngine, record: MeasurementRecord) {
        table.update(record.clone());
        engine.receive(&record);
    }

    async fn recv_within(rx: &mut UnboundedReceiver<MeasurementRecord>) -> Option<MeasurementRecord> {
        timeout(Duration::from_millis(500), rx.recv()).await.ok().flatten()
    }

    struct Failing;

    impl MeasurementListener for Failing {
        fn receive(&self, _record: &MeasurementRecord) -> Result<(), ListenerError> {
            Err(ListenerError::Failed("remote threw".to_string()))
        }
    }

    struct Panicking;

    impl MeasurementListener for Panicking {
        fn receive(&self, _record: &MeasurementRecord) -> Result<(), ListenerError> {
            panic!("listener bug")
        }
    }

    #[tokio::test]
    async fn test_notifies_registered_listener() {
        let table = Arc::new(LastValueTable::new());
        let engine = BroadcastEngine::spawn(table.clone(), 16).unwrap();
        let (listener, mut rx) = ChannelListener::new();
        engine.register("vehicle_speed", ListenerHandle::new(listener));

        route(&table, &engine, MeasurementRecord::new("vehicle_speed", 55.0));
        route(&table, &engine, MeasurementRecord::new("engine_speed", 900.0));

        let got = recv_within(&mut rx).await.unwrap();
        assert_eq!(got.key(), "vehicle_speed");
        assert_eq!(got.value().as_f64(), Some(55.0));
        assert!(recv_within(&mut rx).await.is_none());

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_register_is_idempotent() {
        let table = Arc::new(LastValueTable::new());
        let engine = BroadcastEngine::spawn(table, 16).unwrap();
        let handle = ListenerHandle::new(CallbackListener::new(|_: &MeasurementRecord| {}));

        engine.register("fuel_level", handle.clone());
        engine.register("fuel_level", handle.clone());
        assert_eq!(engine.listener_count("fuel_level"), 1);

        engine.unregister("fuel_level", &handle);
        engine.unregister("fuel_level", &handle);
        engine.unregister("odometer", &handle);
        assert_eq!(engine.listener_count("fuel_level"), 0);

        engine.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_coalescing_delivers_freshest_value() {
        let table = Arc::new(LastValueTable::new());
        let engine = BroadcastEngine::spawn(table.clone(), 1).unwrap();
        let (listener, mut rx) = ChannelListener::new();
        engine.register("steering_wheel_angle", ListenerHandle::new(listener));

        for i in 0..1000 {
            route(
                &table,
                &engine,
                MeasurementRecord::new("steering_wheel_angle", f64::from(i)),
            );
        }

        let mut delivered = Vec::new();
        while let Some(record) = recv_within(&mut rx).await {
            delivered.push(record.value().as_f64().unwrap());
        }

        assert!(!delivered.is_empty());
        assert!(delivered.len() <= 1000);
        assert_eq!(*delivered.last().unwrap(), 999.0);
        assert!(delivered.windows(2).all(|w| w[0] <= w[1]));

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_listener_isolation() {
        let table = Arc::new(LastValueTable::new());
        let engine = BroadcastEngine::spawn(table.clone(), 16).unwrap();
        let (listener, mut rx) = ChannelListener::new();
        engine.register("door_status", ListenerHandle::new(Failing));
        engine.register("door_status", ListenerHandle::new(Panicking));
        engine.register("door_status", ListenerHandle::new(listener));

        route(&table, &engine, MeasurementRecord::new("door_status", "open"));
        route(&table, &engine, MeasurementRecord::new("vehicle_speed", 0.0));

        let got = recv_within(&mut rx).await.unwrap();
        assert_eq!(got.value().as_str(), Some("open"));
        assert_eq!(engine.stats().failures, 2);
        assert_eq!(engine.state(), BroadcastState::Running);

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_disconnected_listener_is_pruned() {
        let table = Arc::new(LastValueTable::new());
        let engine = BroadcastEngine::spawn(table.clone(), 16).unwrap();
        let (listener, rx) = ChannelListener::new();
        engine.register("headlamp_status", ListenerHandle::new(listener));
        drop(rx);

        route(&table, &engine, MeasurementRecord::new("headlamp_status", true));

        let deadline = Instant::now() + Duration::from_millis(500);
        while engine.listener_count("headlamp_status") > 0 && Instant::now() < deadline {
            sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(engine.listener_count("headlamp_status"), 0);
        assert_eq!(engine.stats().pruned, 1);

        engine.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_is_prompt_and_final() {
        let table = Arc::new(LastValueTable::new());
        let engine = BroadcastEngine::spawn(table.clone(), 16).unwrap();
        let (listener, _rx) = ChannelListener::new();
        engine.register("odometer", ListenerHandle::new(listener));

        timeout(Duration::from_secs(1), engine.shutdown())
            .await
            .expect("shutdown should not hang");

        assert_eq!(engine.state(), BroadcastState::Stopped);
        assert!(!engine.receive(&MeasurementRecord::new("odometer", 1.0)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_blocking_listener_does_not_stall_runtime() {
        let table = Arc::new(LastValueTable::new());
        let engine = BroadcastEngine::spawn(table.clone(), 16).unwrap();
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        engine.register(
            "parking_brake",
            ListenerHandle::new(CallbackListener::new(move |_: &MeasurementRecord| {
                let _ = entered_tx.send(std::thread::current().name().map(str::to_string));
                std::thread::sleep(Duration::from_millis(300));
            })),
        );

        route(&table, &engine, MeasurementRecord::new("parking_brake", true));
        let thread_name = tokio::task::spawn_blocking(move || entered_rx.recv_timeout(Duration::from_secs(1)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(thread_name.as_deref(), Some("broadcast-dispatch"));

        // The only runtime thread keeps ticking while the listener blocks
        let started = Instant::now();
        for _ in 0..5 {
            sleep(Duration::from_millis(5)).await;
        }
        assert!(started.elapsed() < Duration::from_millis(200));

        engine.shutdown().await;
        assert_eq!(engine.state(), BroadcastState::Stopped);
    }

    #[tokio::test]
    async fn test_no_signal_without_listeners() {
        let table = Arc::new(LastValueTable::new());
        let engine = BroadcastEngine::spawn(table, 16).unwrap();

        assert!(!engine.receive(&MeasurementRecord::new("odometer", 1.0)));
        assert_eq!(engine.stats().signaled, 0);
        assert!(engine.summary().starts_with("BroadcastEngine{keys=0"));

        engine.shutdown().await;
    }
}
