//! MeasurementKey - Cheap-to-clone signal identifier
//!
//! Uses Arc<str> internally for O(1) clone operations.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Identifier of one distinct telemetry signal (e.g. `vehicle_speed`).
///
/// Keys are created once per signal and then cloned on every routed record,
/// into the last-value table and into broadcast signals, so cloning only
/// bumps a reference count.
///
/// # Examples
/// ```
/// use contracts::MeasurementKey;
///
/// let key: MeasurementKey = "engine_speed".into();
/// let key2 = key.clone();
/// assert_eq!(key, key2);
/// assert_eq!(key.as_str(), "engine_speed");
/// ```
#[derive(Clone, Default)]
pub struct MeasurementKey(Arc<str>);

impl MeasurementKey {
    /// Create a new key from a string slice.
    #[inline]
    pub fn new(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Get the underlying string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for MeasurementKey {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for MeasurementKey {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for MeasurementKey {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MeasurementKey {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for MeasurementKey {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for MeasurementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for MeasurementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MeasurementKey({:?})", self.0)
    }
}

impl PartialEq for MeasurementKey {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for MeasurementKey {}

impl PartialEq<str> for MeasurementKey {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for MeasurementKey {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

// Must hash like `str` so `HashMap<MeasurementKey, _>::get(&str)` works.
impl Hash for MeasurementKey {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl Serialize for MeasurementKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for MeasurementKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}
