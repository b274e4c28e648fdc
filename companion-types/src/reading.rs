//! Glucose readings as supplied by the reading source.

use serde::{Deserialize, Serialize};

/// An immutable glucose reading snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlucoseReading {
    /// Calculated glucose value (mg/dL, or mmol/L scaled by the source).
    pub value: u16,
    /// Slope ordinal, 1..=7.
    pub trend_ordinal: u8,
    /// Reading time, epoch milliseconds.
    pub timestamp_ms: i64,
    /// Identifier of the sensor/collector that produced the reading.
    pub collector_id: String,
}

impl GlucoseReading {
    /// Create a reading.
    pub fn new(
        value: u16,
        trend_ordinal: u8,
        timestamp_ms: i64,
        collector_id: impl Into<String>,
    ) -> Self {
        Self {
            value,
            trend_ordinal,
            timestamp_ms,
            collector_id: collector_id.into(),
        }
    }

    /// Reading time as whole epoch seconds (floored).
    pub fn timestamp_secs(&self) -> i64 {
        self.timestamp_ms.div_euclid(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_secs_floors() {
        let reading = GlucoseReading::new(120, 4, 1_700_000_000_999, "dexcom");
        assert_eq!(reading.timestamp_secs(), 1_700_000_000);
    }

    #[test]
    fn timestamp_secs_floors_before_epoch() {
        let reading = GlucoseReading::new(120, 4, -1, "dexcom");
        assert_eq!(reading.timestamp_secs(), -1);
    }
}
