//! Listener contract for per-key notifications

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::MeasurementRecord;

/// Listener invocation failure
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The remote party is gone; the handle can be pruned
    #[error("listener disconnected")]
    Disconnected,

    /// The listener failed this notification
    #[error("listener failed: {0}")]
    Failed(String),
}

/// Receiver of measurement notifications
///
/// Invoked from the broadcast dispatch thread; implementations adapt the
/// notification to their transport (in-process callback, channel, IPC).
pub trait MeasurementListener: Send + Sync {
    fn receive(&self, record: &MeasurementRecord) -> Result<(), ListenerError>;
}

/// Shared listener handle compared by identity
#[derive(Clone)]
pub struct ListenerHandle(Arc<dyn MeasurementListener>);

impl ListenerHandle {
    pub fn new(listener: impl MeasurementListener + 'static) -> Self {
        Self(Arc::new(listener))
    }

    pub fn from_arc(listener: Arc<dyn MeasurementListener>) -> Self {
        Self(listener)
    }

    pub fn notify(&self, record: &MeasurementRecord) -> Result<(), ListenerError> {
        self.0.receive(record)
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

impl PartialEq for ListenerHandle {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for ListenerHandle {}

impl fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListenerHandle({:p})", self.addr())
    }
}
