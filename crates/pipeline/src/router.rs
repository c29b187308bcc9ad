//! Pipeline router - sources in, sinks out

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use contracts::{IngestCallback, LastValueTable, MeasurementRecord, MeasurementSink, Source};
use parking_lot::RwLock;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{PipelineError, Result};

type SinkList = Arc<Vec<Arc<dyn MeasurementSink>>>;

/// Routes every record from every source to every sink
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct PipelineRouter {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    last_values: Arc<LastValueTable>,
    message_count: AtomicU64,
    /// Copy-on-write; the lock is only held to swap or clone the list
    sinks: RwLock<SinkList>,
    sources: RwLock<Vec<Arc<dyn Source>>>,
}

impl RouterInner {
    fn on_record(&self, record: MeasurementRecord) {
        if let Err(e) = record.validate() {
            debug!(error = %e, "dropping unroutable record");
            return;
        }

        self.last_values.update(record.clone());
        self.message_count.fetch_add(1, Ordering::Relaxed);
        observability::record_record_routed(record.key());

        let sinks = self.sinks.read().clone();
        for sink in sinks.iter() {
            if !sink.receive(&record) {
                trace!(sink = sink.name(), key = %record.key(), "sink did not accept record");
            }
        }
    }
}

impl Default for PipelineRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineRouter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RouterInner {
                last_values: Arc::new(LastValueTable::new()),
                message_count: AtomicU64::new(0),
                sinks: RwLock::new(Arc::new(Vec::new())),
                sources: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Callback handed to sources
    ///
    /// Holds only a weak reference: once the router is dropped, records
    /// produced by lingering source threads are discarded.
    pub fn ingest_callback(&self) -> IngestCallback {
        let weak: Weak<RouterInner> = Arc::downgrade(&self.inner);
        Arc::new(move |record: MeasurementRecord| {
            if let Some(inner) = weak.upgrade() {
                inner.on_record(record);
            }
        })
    }

    /// Route one record: store last value, count, fan out to all sinks
    ///
    /// Records with a NaN or infinite number are dropped uncounted.
    pub fn on_record(&self, record: MeasurementRecord) {
        self.inner.on_record(record);
    }

    /// Start `source` (idempotent) and add it to the live set
    ///
    /// # Errors
    /// `SourceStart` if the source cannot be started; it is not added.
    #[instrument(name = "pipeline_add_source", skip(self, source), fields(source = source.name()))]
    pub fn add_source(&self, source: Arc<dyn Source>) -> Result<()> {
        if let Err(e) = source.start() {
            warn!(error = %e, "source failed to start");
            return Err(PipelineError::SourceStart {
                name: source.name().to_string(),
                message: e.to_string(),
            });
        }

        let mut sources = self.inner.sources.write();
        if !sources.iter().any(|s| Arc::ptr_eq(s, &source)) {
            sources.push(source);
        }
        info!(count = sources.len(), "source added");
        Ok(())
    }

    /// Stop and remove every source
    #[instrument(name = "pipeline_remove_all_sources", skip(self))]
    pub fn remove_all_sources(&self) {
        let removed = std::mem::take(&mut *self.inner.sources.write());
        for source in &removed {
            source.stop();
        }
        info!(count = removed.len(), "removed all sources");
    }

    /// Append a sink to the fan-out list
    #[instrument(name = "pipeline_add_sink", skip(self, sink), fields(sink = sink.name()))]
    pub fn add_sink(&self, sink: Arc<dyn MeasurementSink>) {
        let mut guard = self.inner.sinks.write();
        let mut next: Vec<_> = guard.iter().cloned().collect();
        next.push(sink);
        *guard = Arc::new(next);
        info!(count = guard.len(), "sink added");
    }

    /// Last routed record for `key`
    pub fn get(&self, key: &str) -> Option<MeasurementRecord> {
        self.inner.last_values.get(key)
    }

    /// Total records routed since construction
    pub fn message_count(&self) -> u64 {
        self.inner.message_count.load(Ordering::Relaxed)
    }

    /// Shared handle on the last-value table (read side for listeners)
    pub fn last_values(&self) -> Arc<LastValueTable> {
        self.inner.last_values.clone()
    }

    pub fn sources(&self) -> Vec<Arc<dyn Source>> {
        self.inner.sources.read().clone()
    }

    pub fn sinks(&self) -> Vec<Arc<dyn MeasurementSink>> {
        self.inner.sinks.read().iter().cloned().collect()
    }

    pub fn source_summaries(&self) -> Vec<String> {
        self.inner.sources.read().iter().map(|s| s.summary()).collect()
    }

    pub fn sink_summaries(&self) -> Vec<String> {
        self.inner.sinks.read().iter().map(|s| s.summary()).collect()
    }

    /// Tear down: stop all sources and all sinks
    #[instrument(name = "pipeline_stop", skip(self))]
    pub fn stop(&self) {
        self.remove_all_sources();

        let sinks = std::mem::take(&mut *self.inner.sinks.write());
        for sink in sinks.iter() {
            debug!(sink = sink.name(), "stopping sink");
            sink.stop();
        }
        info!(
            messages = self.message_count(),
            "pipeline stopped"
        );
    }
}
