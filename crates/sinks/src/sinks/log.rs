//! LogSink - logs record summaries via tracing

use contracts::{ContractError, DataSink, MeasurementRecord};
use tracing::{info, instrument};

/// Sink that logs every record for debugging
pub struct LogSink {
    name: String,
    logged: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            logged: 0,
        }
    }

    /// Records logged so far
    pub fn logged(&self) -> u64 {
        self.logged
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, record),
        fields(sink = %self.name, key = %record.key())
    )]
    async fn write(&mut self, record: &MeasurementRecord) -> Result<(), ContractError> {
        self.logged += 1;
        info!(
            sink = %self.name,
            key = %record.key(),
            value = %record.value(),
            timestamp = ?record.timestamp(),
            "Measurement received"
        );
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, logged = self.logged, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");

        sink.write(&MeasurementRecord::new("parking_brake_status", true))
            .await
            .unwrap();
        assert_eq!(sink.logged(), 1);
    }
}
