//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace:
//! the measurement data model, the source/sink/listener traits, the
//! service configuration and the shared error type.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.

mod config;
mod error;
mod last_value;
mod listener;
mod measurement;
mod measurement_key;
mod sink;
mod source;

pub use config::*;
pub use error::*;
pub use last_value::LastValueTable;
pub use listener::{ListenerError, ListenerHandle, MeasurementListener};
pub use measurement::{MeasurementRecord, MeasurementValue};
pub use measurement_key::MeasurementKey;
pub use sink::*;
pub use source::{IngestCallback, Source, SourceContext, VehicleInterface};
