//! Source trait - producer side of the pipeline
//!
//! A source owns a private producer thread and pushes every observed
//! measurement through the [`IngestCallback`] it was constructed with.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::{ContractError, MeasurementRecord};

/// Ingestion callback handed to every source
///
/// Must be callable from the source's own thread at arbitrary frequency.
pub type IngestCallback = Arc<dyn Fn(MeasurementRecord) + Send + Sync>;

/// Construction context passed to source factories
///
/// Carries the type-specific parameters from the service configuration
/// (`[source.params]`).
#[derive(Debug, Clone, Default)]
pub struct SourceContext {
    pub params: HashMap<String, String>,
}

impl SourceContext {
    pub fn new(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    /// Raw parameter value
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Parse a parameter, falling back to `default` when absent
    pub fn parse_param<T: FromStr>(&self, name: &str, default: T) -> Result<T, ContractError> {
        match self.param(name) {
            None => Ok(default),
            Some(raw) => raw.parse().map_err(|_| {
                ContractError::config_validation(
                    format!("source.params.{name}"),
                    format!("cannot parse '{raw}'"),
                )
            }),
        }
    }
}

/// Measurement producer
///
/// Lifecycle: constructed by the source loader (or programmatically),
/// started once, stopped when the pipeline is torn down or its sources are
/// replaced.
pub trait Source: Send + Sync {
    /// Source name (used for logging)
    fn name(&self) -> &str;

    /// Begin producing records on the source's own thread
    ///
    /// Returns immediately. Repeated calls are idempotent. Whether a stopped
    /// source can be started again is up to the implementation.
    fn start(&self) -> Result<(), ContractError>;

    /// Stop producing records and release resources
    fn stop(&self);

    /// Check if the producer is running
    fn is_running(&self) -> bool;

    /// One-line human readable description
    fn summary(&self) -> String {
        self.name().to_string()
    }

    /// View this source as an outbound interface, if it is one
    fn into_vehicle_interface(self: Arc<Self>) -> Option<Arc<dyn VehicleInterface>> {
        None
    }
}

/// A source that also accepts outbound commands
pub trait VehicleInterface: Source {
    /// Try to deliver `command` to the vehicle
    ///
    /// `Ok(false)` means the interface declined the command; `Err` is a
    /// transport fault.
    fn send(&self, command: &MeasurementRecord) -> Result<bool, ContractError>;
}
