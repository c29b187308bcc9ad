//! Outbound command dispatch

use std::sync::Arc;

use contracts::{MeasurementRecord, VehicleInterface};
use parking_lot::RwLock;
use tracing::{debug, instrument, warn};

/// Routes commands to vehicle interfaces in registration order
#[derive(Default)]
pub struct OutboundDispatcher {
    interfaces: RwLock<Vec<Arc<dyn VehicleInterface>>>,
}

impl OutboundDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_interface(&self, interface: Arc<dyn VehicleInterface>) {
        debug!(interface = interface.name(), "interface registered");
        self.interfaces.write().push(interface);
    }

    /// Forget every interface
    pub fn clear(&self) {
        self.interfaces.write().clear();
    }

    pub fn interfaces_len(&self) -> usize {
        self.interfaces.read().len()
    }

    /// Deliver `command` to the first interface that accepts it
    ///
    /// A transport error counts as not accepted and the next interface is
    /// tried. Returns false if no interface accepted the command.
    #[instrument(name = "outbound_send", skip(self, command), fields(key = %command.key()))]
    pub fn send(&self, command: &MeasurementRecord) -> bool {
        let interfaces = self.interfaces.read().clone();

        for interface in &interfaces {
            match interface.send(command) {
                Ok(true) => {
                    debug!(interface = interface.name(), "command sent");
                    return true;
                }
                Ok(false) => continue,
                Err(e) => {
                    warn!(interface = interface.name(), error = %e, "interface failed to send command");
                    continue;
                }
            }
        }

        debug!("no interface able to send command");
        false
    }
}
