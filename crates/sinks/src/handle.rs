//! SinkHandle - runs a DataSink behind an isolated queue and worker task

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use contracts::{DataSink, MeasurementRecord, MeasurementSink};
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, trace};

use crate::error::SinkError;

/// Worker-side counters, shared between the handle and its worker task
#[derive(Debug, Default)]
struct SinkHandleStats {
    queued: AtomicUsize,
    written: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

/// Snapshot of a [`SinkHandle`]'s counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkHandleStatsSnapshot {
    /// Records waiting in the queue (approximate)
    pub queued: usize,
    /// Records the sink accepted
    pub written: u64,
    /// Records the sink failed to write
    pub failed: u64,
    /// Records rejected because the queue was full
    pub dropped: u64,
}

impl SinkHandleStats {
    fn snapshot(&self) -> SinkHandleStatsSnapshot {
        SinkHandleStatsSnapshot {
            queued: self.queued.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Display for SinkHandleStatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "queued={}, written={}, failed={}, dropped={}",
            self.queued, self.written, self.failed, self.dropped
        )
    }
}

/// Handle to a running sink worker
///
/// `receive` never blocks: when the queue is full the record is dropped and
/// counted in [`SinkHandle::stats`]. Drops are logged at trace level only.
pub struct SinkHandle {
    name: String,
    /// None once stopped
    tx: RwLock<Option<mpsc::Sender<MeasurementRecord>>>,
    stats: Arc<SinkHandleStats>,
    worker_handle: Mutex<Option<JoinHandle<()>>>,
}

impl SinkHandle {
    /// Create a new SinkHandle and spawn the worker task
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S: DataSink + 'static>(sink: S, queue_capacity: usize) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let stats = Arc::new(SinkHandleStats::default());

        let worker_stats = Arc::clone(&stats);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_stats, worker_name).await;
        });

        Self {
            name,
            tx: RwLock::new(Some(tx)),
            stats,
            worker_handle: Mutex::new(Some(worker_handle)),
        }
    }

    pub fn stats(&self) -> SinkHandleStatsSnapshot {
        self.stats.snapshot()
    }

    /// Queue a record for the worker (non-blocking)
    ///
    /// Returns true if queued, false if dropped.
    pub fn try_send(&self, record: &MeasurementRecord) -> bool {
        let guard = self.tx.read();
        let Some(tx) = guard.as_ref() else {
            return false;
        };

        match tx.try_send(record.clone()) {
            Ok(()) => {
                self.stats
                    .queued
                    .store(tx.max_capacity() - tx.capacity(), Ordering::Relaxed);
                true
            }
            Err(mpsc::error::TrySendError::Full(r)) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                observability::record_sink_drop(&self.name);
                let err = SinkError::QueueSaturated {
                    sink_name: self.name.clone(),
                };
                trace!(key = %r.key(), error = %err, "Record dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(sink = %self.name, "Sink worker closed unexpectedly");
                false
            }
        }
    }

    /// Stop the worker and wait for it to flush and close the sink
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(&self) {
        MeasurementSink::stop(self);

        let worker = self.worker_handle.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(sink = %self.name, error = ?e, "Worker task panicked");
            }
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

impl MeasurementSink for SinkHandle {
    fn name(&self) -> &str {
        &self.name
    }

    fn receive(&self, record: &MeasurementRecord) -> bool {
        self.try_send(record)
    }

    /// Close the queue; the worker drains what is queued, then exits
    fn stop(&self) {
        if self.tx.write().take().is_some() {
            debug!(sink = %self.name, "SinkHandle stopping");
        }
    }

    fn summary(&self) -> String {
        format!("SinkHandle{{name={}, {}}}", self.name, self.stats())
    }
}

/// Worker task that consumes records and writes them to the sink
#[instrument(
    name = "sink_worker_loop",
    skip(sink, rx, stats),
    fields(sink = %name)
)]
async fn sink_worker<S: DataSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<MeasurementRecord>,
    stats: Arc<SinkHandleStats>,
    name: String,
) {
    debug!(sink = %name, "Sink worker started");

    while let Some(record) = rx.recv().await {
        stats.queued.store(rx.len(), Ordering::Relaxed);
        observability::record_queue_depth(&name, rx.len());

        match sink.write(&record).await {
            Ok(()) => {
                stats.written.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(sink = %name, key = %record.key(), error = %e, "Write failed");
            }
        }
    }

    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ContractError;
    use tokio::time::{sleep, Duration};

    struct MockSink {
        name: String,
        write_count: Arc<AtomicU64>,
        closed: Arc<AtomicU64>,
        should_fail: bool,
        delay_ms: u64,
    }

    impl MockSink {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                write_count: Arc::new(AtomicU64::new(0)),
                closed: Arc::new(AtomicU64::new(0)),
                should_fail: false,
                delay_ms: 0,
            }
        }
    }

    impl DataSink for MockSink {
        fn name(&self) -> &str {
            &self.name
        }

        async fn write(&mut self, _record: &MeasurementRecord) -> Result<(), ContractError> {
            if self.delay_ms > 0 {
                sleep(Duration::from_millis(self.delay_ms)).await;
            }
            if self.should_fail {
                return Err(ContractError::sink_write(&self.name, "mock failure"));
            }
            self.write_count.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }

        async fn flush(&mut self) -> Result<(), ContractError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), ContractError> {
            self.closed.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn record(i: u32) -> MeasurementRecord {
        MeasurementRecord::new("vehicle_speed", f64::from(i))
    }

    #[tokio::test]
    async fn test_sink_handle_drains_on_shutdown() {
        let sink = MockSink::new("test");
        let write_count = Arc::clone(&sink.write_count);
        let closed = Arc::clone(&sink.closed);

        let handle = SinkHandle::spawn(sink, 10);
        for i in 0..5 {
            assert!(handle.receive(&record(i)));
        }

        handle.shutdown().await;
        assert_eq!(write_count.load(Ordering::Relaxed), 5);
        assert_eq!(closed.load(Ordering::Relaxed), 1);
        assert_eq!(handle.stats().written, 5);
    }

    #[tokio::test]
    async fn test_sink_handle_queue_full() {
        let mut sink = MockSink::new("slow");
        sink.delay_ms = 100;

        let handle = SinkHandle::spawn(sink, 2);
        for i in 0..10 {
            handle.receive(&record(i));
        }

        let stats = handle.stats();
        assert!(stats.dropped > 0);
        assert!(handle.summary().contains(&format!("dropped={}", stats.dropped)));
        handle.shutdown().await;
        assert_eq!(handle.stats().written + handle.stats().dropped, 10);
    }

    #[tokio::test]
    async fn test_sink_handle_failure_isolation() {
        let mut sink = MockSink::new("failing");
        sink.should_fail = true;

        let handle = SinkHandle::spawn(sink, 10);
        for i in 0..3 {
            handle.receive(&record(i));
        }

        handle.shutdown().await;
        let stats = handle.stats();
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.written, 0);
    }

    #[tokio::test]
    async fn test_receive_after_stop_is_rejected() {
        let handle = SinkHandle::spawn(MockSink::new("stopped"), 4);
        handle.stop();

        assert!(!handle.receive(&record(1)));
        assert!(handle.summary().starts_with("SinkHandle{name=stopped"));
        handle.shutdown().await;
    }
}
