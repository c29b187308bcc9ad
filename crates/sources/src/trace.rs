//! Trace source - replays a recorded trace file
//!
//! A trace is a JSON-lines file, one canonical record per line (the format
//! written by the file recorder sink). Records are replayed at their
//! original pace, scaled by `speed`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use contracts::{ContractError, IngestCallback, MeasurementRecord, Source, SourceContext};
use tracing::{debug, info, warn};

use crate::pacing::sleep_while_running;

/// Replay configuration
#[derive(Debug, Clone)]
pub struct TraceConfig {
    /// Playback speed multiplier (1.0 = original speed)
    pub speed: f64,
    /// Restart from the beginning when the trace ends
    pub loop_playback: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            loop_playback: false,
        }
    }
}

impl TraceConfig {
    /// Build from `speed` and `loop` parameters
    pub fn from_context(context: &SourceContext) -> Result<Self, ContractError> {
        Ok(Self {
            speed: context.parse_param("speed", 1.0)?,
            loop_playback: context.parse_param("loop", false)?,
        })
    }
}

/// Trace source
///
/// Plays its trace at most once per instance: `start` after completion or
/// `stop` does nothing. Load a new instance to replay again.
pub struct TraceSource {
    path: PathBuf,
    records: Arc<Vec<MeasurementRecord>>,
    config: TraceConfig,
    callback: IngestCallback,
    started: AtomicBool,
    running: Arc<AtomicBool>,
}

impl TraceSource {
    /// Load every record of the trace file into memory
    ///
    /// Lines that do not parse are skipped with a warning.
    pub fn load(
        path: &Path,
        config: TraceConfig,
        callback: IngestCallback,
    ) -> std::io::Result<Self> {
        let reader = BufReader::new(File::open(path)?);

        let mut records = Vec::new();
        let mut skipped = 0usize;

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match MeasurementRecord::from_json(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    skipped += 1;
                    warn!(line = line_no + 1, error = %e, "skipping malformed trace line");
                }
            }
        }

        info!(
            path = %path.display(),
            records = records.len(),
            skipped,
            "loaded trace file"
        );

        Ok(Self {
            path: path.to_path_buf(),
            records: Arc::new(records),
            config,
            callback,
            started: AtomicBool::new(false),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Number of records in the trace
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Replay the whole trace once; returns false if stopped midway
    fn play_once(
        records: &[MeasurementRecord],
        speed: f64,
        running: &AtomicBool,
        callback: &IngestCallback,
    ) -> bool {
        let start_time = Instant::now();
        let first_timestamp = records.iter().find_map(MeasurementRecord::timestamp);

        for record in records {
            if !running.load(Ordering::Relaxed) {
                return false;
            }

            if let (Some(first), Some(ts)) = (first_timestamp, record.timestamp()) {
                let offset = (ts - first).max(0.0);
                let target_elapsed = Duration::from_secs_f64(offset / speed);
                let actual_elapsed = start_time.elapsed();

                if target_elapsed > actual_elapsed
                    && !sleep_while_running(running, target_elapsed - actual_elapsed)
                {
                    return false;
                }
            }

            callback(record.clone());
        }

        true
    }
}

impl Source for TraceSource {
    fn name(&self) -> &str {
        "trace"
    }

    fn start(&self) -> Result<(), ContractError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.running.store(true, Ordering::SeqCst);

        let records = self.records.clone();
        let callback = self.callback.clone();
        let running = self.running.clone();
        let speed = self.config.speed.max(0.1);
        let loop_playback = self.config.loop_playback;
        let path = self.path.clone();

        let spawned = thread::Builder::new()
            .name("trace-source".into())
            .spawn(move || {
                debug!(path = %path.display(), "replay thread started");

                loop {
                    if records.is_empty() {
                        warn!(path = %path.display(), "no records to replay");
                        break;
                    }

                    if !Self::play_once(&records, speed, &running, &callback) {
                        debug!(path = %path.display(), "replay stopped");
                        return;
                    }

                    if !loop_playback {
                        info!(path = %path.display(), "replay completed");
                        break;
                    }

                    debug!(path = %path.display(), "looping replay");
                }

                running.store(false, Ordering::SeqCst);
            });

        if let Err(e) = spawned {
            self.running.store(false, Ordering::SeqCst);
            self.started.store(false, Ordering::SeqCst);
            return Err(e.into());
        }
        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    fn summary(&self) -> String {
        format!(
            "TraceSource{{path={}, records={}, speed={}, loop={}}}",
            self.path.display(),
            self.records.len(),
            self.config.speed,
            self.config.loop_playback
        )
    }
}
