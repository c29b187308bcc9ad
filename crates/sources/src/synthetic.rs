//! Synthetic source
//!
//! Generates periodic numeric values for a fixed set of keys on a
//! background thread. Used for development and demos without a vehicle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use contracts::{ContractError, IngestCallback, MeasurementRecord, Source, SourceContext};
use tracing::{debug, trace};

use crate::pacing::sleep_while_running;

const DEFAULT_KEYS: &str = "vehicle_speed,engine_speed,steering_wheel_angle";

/// Synthetic source configuration
#[derive(Debug, Clone)]
pub struct SyntheticConfig {
    /// Keys to generate values for
    pub keys: Vec<String>,
    /// Emission frequency per key (Hz)
    pub frequency_hz: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            keys: split_keys(DEFAULT_KEYS),
            frequency_hz: 10.0,
        }
    }
}

impl SyntheticConfig {
    /// Build from `keys` (comma separated) and `frequency_hz` parameters
    pub fn from_context(context: &SourceContext) -> Result<Self, ContractError> {
        let keys = split_keys(context.param("keys").unwrap_or(DEFAULT_KEYS));
        if keys.is_empty() {
            return Err(ContractError::config_validation(
                "source.params.keys",
                "at least one key is required",
            ));
        }

        let config = Self {
            keys,
            frequency_hz: context.parse_param("frequency_hz", 10.0)?,
        };
        config.interval()?;
        Ok(config)
    }

    /// Time between two ticks
    ///
    /// # Errors
    /// `ConfigValidation` unless the frequency is finite, positive and
    /// yields a representable period.
    pub fn interval(&self) -> Result<Duration, ContractError> {
        let frequency_hz = self.frequency_hz;
        let invalid = |reason: &str| {
            ContractError::config_validation(
                "source.params.frequency_hz",
                format!("frequency_hz {reason}, got {frequency_hz}"),
            )
        };

        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return Err(invalid("must be a finite number > 0"));
        }
        Duration::try_from_secs_f64(1.0 / frequency_hz).map_err(|_| invalid("is too small"))
    }
}

fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Synthetic source
///
/// One-shot: the first `start` spawns the producer, later calls are no-ops
/// even after `stop`.
pub struct SyntheticSource {
    config: SyntheticConfig,
    callback: IngestCallback,
    started: AtomicBool,
    running: Arc<AtomicBool>,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig, callback: IngestCallback) -> Self {
        Self {
            config,
            callback,
            started: AtomicBool::new(false),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Value of key number `index` at tick `tick`
    fn generate_value(index: usize, tick: u64) -> f64 {
        let phase = tick as f64 / 20.0 + index as f64;
        50.0 + 50.0 * phase.sin()
    }
}

impl Source for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn start(&self) -> Result<(), ContractError> {
        let interval = self.config.interval()?;
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.running.store(true, Ordering::SeqCst);

        let keys = self.config.keys.clone();
        let frequency_hz = self.config.frequency_hz;
        let callback = self.callback.clone();
        let running = self.running.clone();

        let spawned = thread::Builder::new()
            .name("synthetic-source".into())
            .spawn(move || {
                debug!(keys = keys.len(), frequency_hz, "synthetic source started");

                let mut tick: u64 = 0;
                loop {
                    for (index, key) in keys.iter().enumerate() {
                        callback(MeasurementRecord::new(
                            key.as_str(),
                            Self::generate_value(index, tick),
                        ));
                    }
                    trace!(tick, "synthetic tick emitted");
                    tick += 1;

                    if !sleep_while_running(&running, interval) {
                        break;
                    }
                }

                debug!("synthetic source stopped");
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
            "SyntheticSource{{keys={}, frequency_hz={}}}",
            self.config.keys.join("|"),
            self.config.frequency_hz
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::collections::HashSet;

    #[test]
    fn test_config_from_context() {
        let mut params = HashMap::new();
        params.insert("keys".to_string(), "fuel_level, odometer,".to_string());
        params.insert("frequency_hz".to_string(), "50".to_string());

        let config = SyntheticConfig::from_context(&SourceContext::new(params)).unwrap();
        assert_eq!(config.keys, vec!["fuel_level", "odometer"]);
        assert_eq!(config.frequency_hz, 50.0);
    }

    #[test]
    fn test_config_rejects_unusable_frequency() {
        for raw in ["0", "-5", "NaN", "inf", "1e-20"] {
            let mut params = HashMap::new();
            params.insert("frequency_hz".to_string(), raw.to_string());
            let result = SyntheticConfig::from_context(&SourceContext::new(params));
            assert!(
                matches!(result, Err(ContractError::ConfigValidation { .. })),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_start_rejects_unusable_frequency() {
        let source = SyntheticSource::new(
            SyntheticConfig {
                keys: vec!["a".into()],
                frequency_hz: 1e-20,
            },
            Arc::new(|_| {}),
        );

        assert!(source.start().is_err());
        assert!(!source.is_running());
    }

    #[test]
    fn test_emits_every_key() {
        let seen = Arc::new(Mutex::new(HashSet::new()));
        let seen_clone = seen.clone();
        let source = SyntheticSource::new(
            SyntheticConfig {
                keys: vec!["a".into(), "b".into()],
                frequency_hz: 100.0,
            },
            Arc::new(move |record: MeasurementRecord| {
                seen_clone.lock().insert(record.key().to_string());
            }),
        );

        source.start().unwrap();
        assert!(source.is_running());
        thread::sleep(Duration::from_millis(50));
        source.stop();

        assert!(!source.is_running());
        let seen = seen.lock();
        assert!(seen.contains("a") && seen.contains("b"));
    }

    #[test]
    fn test_idempotent_start() {
        let count = Arc::new(Mutex::new(0u64));
        let count_clone = count.clone();
        let source = SyntheticSource::new(
            SyntheticConfig {
                keys: vec!["a".into()],
                frequency_hz: 1.0,
            },
            Arc::new(move |_| *count_clone.lock() += 1),
        );

        source.start().unwrap();
        source.start().unwrap();
        thread::sleep(Duration::from_millis(100));
        source.stop();

        // A single 1 Hz producer emits exactly one tick within 100ms
        assert_eq!(*count.lock(), 1);

        // Not restarted after stop
        source.start().unwrap();
        thread::sleep(Duration::from_millis(100));
        assert!(!source.is_running());
        assert_eq!(*count.lock(), 1);
    }
}
