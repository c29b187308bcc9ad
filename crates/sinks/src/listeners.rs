//! Listener transport adapters

use contracts::{ListenerError, MeasurementListener, MeasurementRecord};
use tokio::sync::mpsc;

/// In-process listener backed by a closure
pub struct CallbackListener<F> {
    callback: F,
}

impl<F> CallbackListener<F>
where
    F: Fn(&MeasurementRecord) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> MeasurementListener for CallbackListener<F>
where
    F: Fn(&MeasurementRecord) + Send + Sync,
{
    fn receive(&self, record: &MeasurementRecord) -> Result<(), ListenerError> {
        (self.callback)(record);
        Ok(())
    }
}

/// Listener that forwards notifications over a channel
///
/// The receiving half may live on another task or thread. Once it is
/// dropped the listener reports [`ListenerError::Disconnected`] and the
/// broadcast engine prunes it.
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<MeasurementRecord>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MeasurementRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MeasurementListener for ChannelListener {
    fn receive(&self, record: &MeasurementRecord) -> Result<(), ListenerError> {
        self.tx
            .send(record.clone())
            .map_err(|_| ListenerError::Disconnected)
    }
}
