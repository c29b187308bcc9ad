//! Construction of auxiliary sinks from configuration

use contracts::{SinkConfig, SinkType};
use tracing::{info, instrument};

use crate::error::SinkError;
use crate::handle::SinkHandle;
use crate::sinks::{FileSink, LogSink};

/// Build a queue-isolated sink handle for one `[[sinks]]` entry
///
/// Must be called from within a tokio runtime.
#[instrument(name = "sink_builder_build", skip(config), fields(sink = %config.name))]
pub fn build_sink(config: &SinkConfig) -> Result<SinkHandle, SinkError> {
    let handle = match config.sink_type {
        SinkType::Log => SinkHandle::spawn(LogSink::new(&config.name), config.queue_capacity),
        SinkType::File => {
            let sink = FileSink::from_params(&config.name, &config.params)
                .map_err(|e| SinkError::sink_creation(&config.name, e.to_string()))?;
            SinkHandle::spawn(sink, config.queue_capacity)
        }
    };

    info!(sink_type = ?config.sink_type, queue_capacity = config.queue_capacity, "sink created");
    Ok(handle)
}

/// Build every configured sink, failing on the first error
pub fn build_sinks(configs: &[SinkConfig]) -> Result<Vec<SinkHandle>, SinkError> {
    configs.iter().map(build_sink).collect()
}
