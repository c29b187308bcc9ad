//! # Sinks
//!
//! Consumers registered on the pipeline router.
//!
//! Responsibilities:
//! - Notify per-key listeners without blocking producers (`BroadcastEngine`)
//! - Batch and relay records to a remote collector (`UploadSink`)
//! - Isolate slow auxiliary sinks behind a bounded queue (`SinkHandle`)

pub mod broadcast;
pub mod builder;
pub mod error;
pub mod handle;
pub mod listeners;
pub mod sinks;
pub mod upload;

pub use broadcast::{
    BroadcastEngine, BroadcastState, BroadcastStatsSnapshot, DEFAULT_SIGNAL_CAPACITY,
};
pub use builder::{build_sink, build_sinks};
pub use contracts::{DataSink, MeasurementSink};
pub use error::SinkError;
pub use handle::{SinkHandle, SinkHandleStatsSnapshot};
pub use listeners::{CallbackListener, ChannelListener};
pub use sinks::{FileSink, FileSinkConfig, LogSink};
pub use upload::{
    build_envelope, HttpTransport, UploadSink, UploadStatsSnapshot, UploadTransport,
    STATUS_CREATED,
};
