//! Batch upload sink - relays records to a remote HTTP collector
//!
//! Records are buffered as their serialized form (bounded, overflow is
//! dropped) and a single uploader task POSTs them in batches wrapped as
//! `{"records":[...]}`. Delivery is best-effort: a failed request is logged
//! and its batch is lost, transport failures additionally back off.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use contracts::{MeasurementRecord, MeasurementSink, UploadConfig};
use observability::{RunningStats, StatsSummary, UploadOutcome};
use parking_lot::Mutex;
use reqwest::header::CONTENT_TYPE;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::SinkError;

/// Status code the collector answers on success
pub const STATUS_CREATED: u16 = 201;

/// Request transport used by the uploader task
#[trait_variant::make(UploadTransport: Send)]
pub trait LocalUploadTransport {
    /// POST `body` and return the response status code
    ///
    /// # Errors
    /// `UploadTransportFailure` when no response was received.
    async fn post(&self, body: String) -> Result<u16, SinkError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: reqwest::Client,
    url: Url,
}

impl HttpTransport {
    /// Build a client with the configured request timeout
    pub fn new(config: &UploadConfig) -> Result<Self, SinkError> {
        let url = Url::parse(&config.url)
            .map_err(|e| SinkError::sink_creation("upload", format!("invalid url '{}': {e}", config.url)))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SinkError::sink_creation("upload", e.to_string()))?;

        Ok(Self { client, url })
    }
}

impl UploadTransport for HttpTransport {
    async fn post(&self, body: String) -> Result<u16, SinkError> {
        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| SinkError::transport(e.to_string()))?;

        Ok(response.status().as_u16())
    }
}

/// Upload counters
#[derive(Debug, Default)]
pub struct UploadStats {
    accepted_batches: AtomicU64,
    uploaded_records: AtomicU64,
    unexpected_status: AtomicU64,
    transport_failures: AtomicU64,
    dropped_records: AtomicU64,
    latency_ms: Mutex<RunningStats>,
}

/// Snapshot of [`UploadStats`]
#[derive(Debug, Clone, Default)]
pub struct UploadStatsSnapshot {
    pub accepted_batches: u64,
    pub uploaded_records: u64,
    pub unexpected_status: u64,
    pub transport_failures: u64,
    /// Records rejected because the buffer was full
    pub dropped_records: u64,
    pub latency_ms: StatsSummary,
}

impl UploadStats {
    pub fn snapshot(&self) -> UploadStatsSnapshot {
        UploadStatsSnapshot {
            accepted_batches: self.accepted_batches.load(Ordering::Relaxed),
            uploaded_records: self.uploaded_records.load(Ordering::Relaxed),
            unexpected_status: self.unexpected_status.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            dropped_records: self.dropped_records.load(Ordering::Relaxed),
            latency_ms: StatsSummary::from(&*self.latency_ms.lock()),
        }
    }
}

struct UploadShared {
    buffer: Mutex<VecDeque<String>>,
    capacity: usize,
    batch_size: usize,
    wake: Notify,
    cancel: CancellationToken,
    stats: UploadStats,
}

impl UploadShared {
    fn take_batch(&self) -> Vec<String> {
        let mut buffer = self.buffer.lock();
        let n = buffer.len().min(self.batch_size);
        buffer.drain(..n).collect()
    }
}

/// Sink that batches records and POSTs them to a collector
pub struct UploadSink {
    name: String,
    url: String,
    shared: Arc<UploadShared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl UploadSink {
    /// Start an upload sink talking HTTP to `config.url`
    pub fn spawn_http(config: &UploadConfig) -> Result<Self, SinkError> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::spawn(config, transport))
    }

    /// Start an upload sink over an arbitrary transport
    ///
    /// Must be called from within a tokio runtime.
    #[instrument(name = "upload_sink_spawn", skip(config, transport), fields(url = %config.url))]
    pub fn spawn<T: UploadTransport + 'static>(config: &UploadConfig, transport: T) -> Self {
        let batch_size = config.batch_size.max(1);
        let shared = Arc::new(UploadShared {
            buffer: Mutex::new(VecDeque::with_capacity(config.capacity.min(1024))),
            capacity: config.capacity.max(batch_size),
            batch_size,
            wake: Notify::new(),
            cancel: CancellationToken::new(),
            stats: UploadStats::default(),
        });

        let task = tokio::spawn(upload_loop(
            transport,
            Arc::clone(&shared),
            config.backoff(),
        ));
        info!(batch_size, capacity = shared.capacity, "upload sink started");

        Self {
            name: "upload".to_string(),
            url: config.url.clone(),
            shared,
            task: Mutex::new(Some(task)),
        }
    }

    /// Records waiting to be uploaded
    pub fn queued(&self) -> usize {
        self.shared.buffer.lock().len()
    }

    pub fn stats(&self) -> UploadStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// Cancel and wait for the uploader task; queued records are discarded
    #[instrument(name = "upload_sink_shutdown", skip(self))]
    pub async fn shutdown(&self) {
        MeasurementSink::stop(self);

        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = ?e, "uploader task panicked");
            }
        }
    }
}

impl MeasurementSink for UploadSink {
    fn name(&self) -> &str {
        &self.name
    }

    /// Buffer the serialized record; always reports acceptance
    fn receive(&self, record: &MeasurementRecord) -> bool {
        let len = {
            let mut buffer = self.shared.buffer.lock();
            if buffer.len() >= self.shared.capacity {
                drop(buffer);
                self.shared
                    .stats
                    .dropped_records
                    .fetch_add(1, Ordering::Relaxed);
                observability::record_sink_drop(&self.name);
                return true;
            }
            buffer.push_back(record.serialized().to_owned());
            buffer.len()
        };

        if len == 1 || len >= self.shared.batch_size {
            self.shared.wake.notify_one();
        }
        observability::record_queue_depth(&self.name, len);
        true
    }

    fn stop(&self) {
        if !self.shared.cancel.is_cancelled() {
            debug!(url = %self.url, "upload sink stopping");
            self.shared.cancel.cancel();
        }
    }

    fn summary(&self) -> String {
        format!("UploadSink{{url={}, queued={}}}", self.url, self.queued())
    }
}

/// Wrap already serialized records into the upload envelope
pub fn build_envelope(records: &[String]) -> String {
    let body_len: usize = records.iter().map(|r| r.len() + 1).sum();
    let mut body = String::with_capacity(body_len + 14);
    body.push_str("{\"records\":[");
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            body.push(',');
        }
        body.push_str(record);
    }
    body.push_str("]}");
    body
}

#[instrument(name = "upload_loop", skip_all)]
async fn upload_loop<T: UploadTransport>(
    transport: T,
    shared: Arc<UploadShared>,
    backoff: std::time::Duration,
) {
    debug!("uploader task started");

    loop {
        if shared.cancel.is_cancelled() {
            break;
        }

        let batch = shared.take_batch();
        if batch.is_empty() {
            tokio::select! {
                biased;
                _ = shared.cancel.cancelled() => break,
                _ = shared.wake.notified() => continue,
            }
        }

        let batch_len = batch.len();
        let body = build_envelope(&batch);
        let started = Instant::now();

        let result = tokio::select! {
            biased;
            _ = shared.cancel.cancelled() => break,
            result = transport.post(body) => result,
        };
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        shared.stats.latency_ms.lock().push(latency_ms);

        match result {
            Ok(STATUS_CREATED) => {
                shared.stats.accepted_batches.fetch_add(1, Ordering::Relaxed);
                shared
                    .stats
                    .uploaded_records
                    .fetch_add(batch_len as u64, Ordering::Relaxed);
                observability::record_upload(UploadOutcome::Accepted, batch_len, latency_ms);
                debug!(records = batch_len, "batch uploaded");
            }
            Ok(status) => {
                shared.stats.unexpected_status.fetch_add(1, Ordering::Relaxed);
                observability::record_upload(UploadOutcome::UnexpectedStatus, batch_len, latency_ms);
                let err = SinkError::UploadUnexpectedStatus { status };
                warn!(error = %err, records = batch_len, "batch rejected by collector");
            }
            Err(err) => {
                shared.stats.transport_failures.fetch_add(1, Ordering::Relaxed);
                observability::record_upload(UploadOutcome::TransportFailure, batch_len, latency_ms);
                warn!(
                    error = %err,
                    records = batch_len,
                    backoff_ms = backoff.as_millis() as u64,
                    "upload failed, backing off"
                );

                tokio::select! {
                    biased;
                    _ = shared.cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
        }
    }

    debug!(
        discarded = shared.buffer.lock().len(),
        "uploader task stopped"
    );
}
