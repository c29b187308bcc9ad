//! Application source - loopback for application-injected measurements
//!
//! Has no producer thread of its own: records handed to
//! [`ApplicationSource::handle_message`] are forwarded on the caller's
//! thread. The service keeps one instance alive for its whole lifetime.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use contracts::{ContractError, IngestCallback, MeasurementRecord, Source};
use tracing::{debug, trace};

/// Loopback source for data injected by applications
pub struct ApplicationSource {
    callback: IngestCallback,
    running: AtomicBool,
    forwarded: AtomicU64,
}

impl ApplicationSource {
    pub fn new(callback: IngestCallback) -> Self {
        Self {
            callback,
            running: AtomicBool::new(false),
            forwarded: AtomicU64::new(0),
        }
    }

    /// Forward an application record into the pipeline
    ///
    /// Returns false (and drops the record) while the source is stopped or
    /// when the record carries a non-finite number.
    pub fn handle_message(&self, record: MeasurementRecord) -> bool {
        if !self.running.load(Ordering::Acquire) {
            trace!(key = %record.key(), "application source stopped, record ignored");
            return false;
        }
        if let Err(e) = record.validate() {
            debug!(error = %e, "application record rejected");
            return false;
        }
        self.forwarded.fetch_add(1, Ordering::Relaxed);
        (self.callback)(record);
        true
    }

    /// Records forwarded so far
    pub fn forwarded_count(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }
}

impl Source for ApplicationSource {
    fn name(&self) -> &str {
        "application"
    }

    fn start(&self) -> Result<(), ContractError> {
        if !self.running.swap(true, Ordering::AcqRel) {
            debug!("application source started");
        }
        Ok(())
    }

    fn stop(&self) {
        if self.running.swap(false, Ordering::AcqRel) {
            debug!("application source stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn summary(&self) -> String {
        format!("ApplicationSource{{forwarded={}}}", self.forwarded_count())
    }
}
