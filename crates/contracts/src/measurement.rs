//! MeasurementRecord - the unit moved through the pipeline
//!
//! A record is one key/value sample. Its canonical JSON form is computed
//! once on first use and cached, since both the upload sink and the trace
//! recorder need it for every record.

use std::fmt;
use std::sync::OnceLock;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{ContractError, MeasurementKey};

/// Measurement value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    /// Numeric sample (speeds, angles, levels)
    Number(f64),
    /// Boolean state (e.g. `parking_brake_status`)
    Bool(bool),
    /// Textual state (e.g. `transmission_gear_position`)
    Text(String),
    /// Opaque payload, serialized as a JSON array of byte values
    Bytes(Bytes),
}

impl MeasurementValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// False for NaN and infinite numbers
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Number(n) => n.is_finite(),
            _ => true,
        }
    }
}

impl From<f64> for MeasurementValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for MeasurementValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for MeasurementValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for MeasurementValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Bytes> for MeasurementValue {
    fn from(v: Bytes) -> Self {
        Self::Bytes(v)
    }
}

impl fmt::Display for MeasurementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => f.write_str(s),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

/// One telemetry sample.
///
/// Serializes as `{"name": ..., "value": ..., "event": ..., "timestamp": ...}`
/// with `event` and `timestamp` omitted when absent. Outbound commands use
/// the same type.
///
/// Construction accepts any `f64`, but JSON has no NaN or infinity: such
/// numbers serialize as `null` and cannot be parsed back. The router drops
/// records failing [`MeasurementRecord::validate`] before they reach any
/// sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementRecord {
    #[serde(rename = "name")]
    key: MeasurementKey,

    value: MeasurementValue,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    event: Option<MeasurementValue>,

    /// Seconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<f64>,

    #[serde(skip)]
    serialized: OnceLock<String>,
}

impl MeasurementRecord {
    /// Create a record stamped with the current wall-clock time
    pub fn new(key: impl Into<MeasurementKey>, value: impl Into<MeasurementValue>) -> Self {
        let now = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
        Self::with_timestamp(key, value, Some(now))
    }

    /// Create a record with an explicit (or no) timestamp
    pub fn with_timestamp(
        key: impl Into<MeasurementKey>,
        value: impl Into<MeasurementValue>,
        timestamp: Option<f64>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            event: None,
            timestamp,
            serialized: OnceLock::new(),
        }
    }

    /// Attach an event value (e.g. the button state of a `button_event`)
    pub fn with_event(mut self, event: impl Into<MeasurementValue>) -> Self {
        self.event = Some(event.into());
        self.serialized = OnceLock::new();
        self
    }

    /// Parse a record from its canonical JSON form
    pub fn from_json(line: &str) -> Result<Self, ContractError> {
        serde_json::from_str(line).map_err(|e| ContractError::RecordParse {
            message: e.to_string(),
        })
    }

    pub fn key(&self) -> &MeasurementKey {
        &self.key
    }

    pub fn value(&self) -> &MeasurementValue {
        &self.value
    }

    pub fn event(&self) -> Option<&MeasurementValue> {
        self.event.as_ref()
    }

    pub fn timestamp(&self) -> Option<f64> {
        self.timestamp
    }

    /// Check that every numeric field is finite
    ///
    /// # Errors
    /// `NonFiniteValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), ContractError> {
        let field = if !self.value.is_finite() {
            "value"
        } else if !self.event.as_ref().map_or(true, MeasurementValue::is_finite) {
            "event"
        } else if !self.timestamp.map_or(true, f64::is_finite) {
            "timestamp"
        } else {
            return Ok(());
        };

        Err(ContractError::NonFiniteValue {
            key: self.key.to_string(),
            field,
        })
    }

    /// Canonical JSON form, computed on first call
    pub fn serialized(&self) -> &str {
        self.serialized.get_or_init(|| {
            // Only string keys and plain values: serialization cannot fail.
            serde_json::to_string(self).unwrap_or_default()
        })
    }
}

impl PartialEq for MeasurementRecord {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
            && self.value == other.value
            && self.event == other.event
            && self.timestamp == other.timestamp
    }
}

impl fmt::Display for MeasurementRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)?;
        if let Some(event) = &self.event {
            write!(f, " ({event})")?;
        }
        Ok(())
    }
}
