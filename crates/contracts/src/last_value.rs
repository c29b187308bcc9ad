//! LastValueTable - most recent record per key

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::{MeasurementKey, MeasurementRecord};

/// Most recent record per key
///
/// Written by the router on every routed record, read by `get` queries and
/// by the broadcast dispatch thread. Last writer wins.
#[derive(Debug, Default)]
pub struct LastValueTable {
    values: RwLock<HashMap<MeasurementKey, MeasurementRecord>>,
}

impl LastValueTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored record for `record.key()`
    pub fn update(&self, record: MeasurementRecord) {
        self.values.write().insert(record.key().clone(), record);
    }

    /// Current record for `key`
    pub fn get(&self, key: &str) -> Option<MeasurementRecord> {
        self.values.read().get(key).cloned()
    }

    /// Number of distinct keys seen
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_writer_wins() {
        let table = LastValueTable::new();
        for v in 0..10 {
            table.update(MeasurementRecord::with_timestamp("steering_wheel_angle", v as f64, None));
        }
        let latest = table.get("steering_wheel_angle").unwrap();
        assert_eq!(latest.value().as_f64(), Some(9.0));
        assert_eq!(table.len(), 1);
        assert!(table.get("unknown").is_none());
    }
}
