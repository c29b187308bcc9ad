//! Sink traits - consumer side of the pipeline
//!
//! [`MeasurementSink`] is what the router fans out to; it must never block.
//! [`DataSink`] is the simpler async contract for sinks that are run behind
//! a queue-isolated worker.

use crate::{ContractError, MeasurementRecord};

/// Non-blocking consumer registered on the router
pub trait MeasurementSink: Send + Sync {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Offer a record to the sink
    ///
    /// Must return promptly; a sink buffers internally and may drop under
    /// overload. Returns whether the record was accepted.
    fn receive(&self, record: &MeasurementRecord) -> bool;

    /// Ask the sink's consumer to exit
    fn stop(&self);

    /// One-line human readable description
    fn summary(&self) -> String {
        self.name().to_string()
    }
}

/// Data output trait for worker-driven sinks
#[trait_variant::make(DataSink: Send)]
pub trait LocalDataSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one record
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, record: &MeasurementRecord) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
