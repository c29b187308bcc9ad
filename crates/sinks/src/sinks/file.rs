//! FileSink - records a replayable trace file

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use contracts::{ContractError, DataSink, MeasurementRecord};
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Trace file to write
    pub path: PathBuf,
    /// Append to an existing file instead of truncating it
    pub append: bool,
}

impl FileSinkConfig {
    /// Create config from `[sinks.params]`
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let path = params
            .get("path")
            .map(PathBuf::from)
            .ok_or_else(|| "missing 'path' parameter".to_string())?;

        let append = match params.get("append").map(String::as_str) {
            None | Some("false") => false,
            Some("true") => true,
            Some(other) => return Err(format!("invalid 'append' value '{other}'")),
        };

        Ok(Self { path, append })
    }
}

/// Sink that writes one canonical JSON record per line
///
/// The output is the format the trace source replays.
pub struct FileSink {
    name: String,
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// Open (and create parent directories of) the trace file
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(config.append)
            .truncate(!config.append)
            .open(&config.path)?;

        Ok(Self {
            name: name.into(),
            path: config.path,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Create from params map (for the sink builder)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let config = FileSinkConfig::from_params(params)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        Self::new(name, config)
    }

    fn write_line(&mut self, record: &MeasurementRecord) -> std::io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| std::io::Error::other("file sink already closed"))?;
        writer.write_all(record.serialized().as_bytes())?;
        writer.write_all(b"\n")
    }
}

impl DataSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, record),
        fields(sink = %self.name, key = %record.key())
    )]
    async fn write(&mut self, record: &MeasurementRecord) -> Result<(), ContractError> {
        self.write_line(record).map_err(|e| {
            error!(sink = %self.name, path = %self.path.display(), error = %e, "Write failed");
            ContractError::sink_write(&self.name, e.to_string())
        })
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        }
        debug!(sink = %self.name, path = %self.path.display(), "FileSink closed");
        Ok(())
    }
}
