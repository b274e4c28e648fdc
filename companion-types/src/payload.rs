//! Device-bound reading payload.
//!
//! The shape of [`WireReading`] is a compatibility contract with the installed
//! companion apps: exactly `trend` (u8), `timestamp` (i64 epoch seconds) and
//! `glucose` (i64). Do not rename or retype these fields.

use serde::{Deserialize, Serialize};

use crate::{GlucoseReading, PayloadError};

/// Maximum number of readings carried in one payload.
pub const MAX_PAYLOAD_READINGS: usize = 2;

/// One reading in the device-bound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireReading {
    /// Slope ordinal, 1..=7.
    pub trend: u8,
    /// Epoch seconds.
    pub timestamp: i64,
    /// Glucose value.
    pub glucose: i64,
}

impl From<&GlucoseReading> for WireReading {
    fn from(reading: &GlucoseReading) -> Self {
        Self {
            trend: reading.trend_ordinal,
            timestamp: reading.timestamp_secs(),
            glucose: i64::from(reading.value),
        }
    }
}

/// The message pushed to a companion app: 1 or 2 readings, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReadingPayload(Vec<WireReading>);

impl ReadingPayload {
    /// Build a payload from readings ordered newest first.
    ///
    /// Only the first [`MAX_PAYLOAD_READINGS`] readings are used.
    pub fn from_readings(readings: &[GlucoseReading]) -> Result<Self, PayloadError> {
        if readings.is_empty() {
            return Err(PayloadError::NoData);
        }
        Ok(Self(
            readings
                .iter()
                .take(MAX_PAYLOAD_READINGS)
                .map(WireReading::from)
                .collect(),
        ))
    }

    /// The records in send order.
    pub fn records(&self) -> &[WireReading] {
        &self.0
    }

    /// Number of records (1 or 2).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a constructed payload.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render the payload as a JSON array.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.0)
    }
}
