//! Relay metrics collection
//!
//! Thin recording helpers over the `metrics` facade. Without an installed
//! recorder every call is a no-op.

use metrics::{counter, gauge, histogram};

/// Record a measurement routed through the pipeline router
pub fn record_record_routed(key: &str) {
    counter!("telemetry_relay_records_routed_total").increment(1);
    counter!(
        "telemetry_relay_records_routed_by_key_total",
        "key" => key.to_string()
    )
    .increment(1);
}

/// Record a record dropped by a sink because its queue was saturated
pub fn record_sink_drop(sink_name: &str) {
    counter!(
        "telemetry_relay_sink_dropped_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
}

/// Outcome of one upload request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Collector answered 201
    Accepted,
    /// Collector answered with another status
    UnexpectedStatus,
    /// Request never got a response
    TransportFailure,
}

impl UploadOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::UnexpectedStatus => "unexpected_status",
            Self::TransportFailure => "transport_failure",
        }
    }
}

/// Record one batch upload attempt
pub fn record_upload(outcome: UploadOutcome, batch_size: usize, latency_ms: f64) {
    counter!(
        "telemetry_relay_uploads_total",
        "outcome" => outcome.as_str()
    )
    .increment(1);

    if outcome == UploadOutcome::Accepted {
        counter!("telemetry_relay_uploaded_records_total").increment(batch_size as u64);
    }

    histogram!("telemetry_relay_upload_batch_size").record(batch_size as f64);
    histogram!("telemetry_relay_upload_latency_ms").record(latency_ms);
}

/// Record one listener notification
pub fn record_notification(key: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "telemetry_relay_notifications_total",
        "key" => key.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record the current depth of a named queue
pub fn record_queue_depth(queue: &str, depth: usize) {
    gauge!(
        "telemetry_relay_queue_depth",
        "queue" => queue.to_string()
    )
    .set(depth as f64);
}

/// Online statistics calculator (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a sample
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Point-in-time view of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}
