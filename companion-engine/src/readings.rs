//! Reading source abstraction.
//!
//! The engine never stores readings. It asks the source for the newest ones
//! each time a push is triggered.

use async_trait::async_trait;
use companion_types::GlucoseReading;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of recent glucose readings.
#[async_trait]
pub trait ReadingSource: Send + Sync + 'static {
    /// At most `limit` readings from the last `lookback`, newest first.
    async fn latest_readings(&self, limit: usize, lookback: Duration) -> Vec<GlucoseReading>;
}

/// Fixed readings for tests and demos.
///
/// Returns the configured readings that fall inside the lookback window,
/// truncated to `limit`, and records every request. The window ends at the
/// wall clock unless a fixed "now" is set. Clones share state.
#[derive(Debug, Default, Clone)]
pub struct StaticReadings {
    inner: Arc<Mutex<StaticReadingsInner>>,
}

#[derive(Debug, Default)]
struct StaticReadingsInner {
    readings: Vec<GlucoseReading>,
    requests: Vec<(usize, Duration)>,
    now_ms: Option<i64>,
}

impl StaticReadings {
    /// Create a source with the given readings, newest first.
    pub fn new(readings: Vec<GlucoseReading>) -> Self {
        let source = Self::default();
        source.set_readings(readings);
        source
    }

    /// Pin the end of the lookback window to `now_ms` (Unix milliseconds).
    pub fn with_now_ms(self, now_ms: i64) -> Self {
        self.set_now_ms(now_ms);
        self
    }

    /// Pin the end of the lookback window to `now_ms` (Unix milliseconds).
    pub fn set_now_ms(&self, now_ms: i64) {
        self.inner.lock().unwrap().now_ms = Some(now_ms);
    }

    /// Replace the readings.
    pub fn set_readings(&self, readings: Vec<GlucoseReading>) {
        self.inner.lock().unwrap().readings = readings;
    }

    /// Every `(limit, lookback)` request, in call order.
    pub fn requests(&self) -> Vec<(usize, Duration)> {
        self.inner.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl ReadingSource for StaticReadings {
    async fn latest_readings(&self, limit: usize, lookback: Duration) -> Vec<GlucoseReading> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.push((limit, lookback));

        let now_ms = inner.now_ms.unwrap_or_else(wall_clock_ms);
        let window_ms = i64::try_from(lookback.as_millis()).unwrap_or(i64::MAX);
        let oldest_ms = now_ms.saturating_sub(window_ms);
        inner
            .readings
            .iter()
            .filter(|reading| reading.timestamp_ms >= oldest_ms)
            .take(limit)
            .cloned()
            .collect()
    }
}

fn wall_clock_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE_MS: i64 = 60 * 1000;

    #[tokio::test]
    async fn truncates_to_limit_and_records_request() {
        let source = StaticReadings::new(vec![
            GlucoseReading::new(120, 4, 3_000, "c"),
            GlucoseReading::new(110, 4, 2_000, "c"),
            GlucoseReading::new(100, 4, 1_000, "c"),
        ])
        .with_now_ms(3_000);

        let readings = source
            .latest_readings(2, Duration::from_secs(30 * 60))
            .await;

        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].value, 120);
        assert_eq!(source.requests(), vec![(2, Duration::from_secs(1800))]);
    }

    #[tokio::test]
    async fn readings_older_than_lookback_are_excluded() {
        let now = 1_700_000_000_000;
        let source = StaticReadings::new(vec![
            GlucoseReading::new(120, 4, now - 20 * MINUTE_MS, "c"),
            GlucoseReading::new(110, 4, now - 31 * MINUTE_MS, "c"),
        ])
        .with_now_ms(now);

        let readings = source
            .latest_readings(2, Duration::from_secs(30 * 60))
            .await;

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value, 120);
    }

    #[tokio::test]
    async fn reading_on_window_edge_is_kept() {
        let now = 1_700_000_000_000;
        let source = StaticReadings::new(vec![GlucoseReading::new(
            120,
            4,
            now - 30 * MINUTE_MS,
            "c",
        )])
        .with_now_ms(now);

        assert_eq!(
            source
                .latest_readings(2, Duration::from_secs(30 * 60))
                .await
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn unpinned_source_uses_wall_clock() {
        let source = StaticReadings::new(vec![
            GlucoseReading::new(120, 4, wall_clock_ms(), "c"),
            GlucoseReading::new(110, 4, 1_000, "c"),
        ]);

        let readings = source
            .latest_readings(2, Duration::from_secs(30 * 60))
            .await;

        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].value, 120);
    }

    #[tokio::test]
    async fn huge_lookback_keeps_everything() {
        let source = StaticReadings::new(vec![GlucoseReading::new(100, 4, 1_000, "c")])
            .with_now_ms(1_700_000_000_000);

        assert_eq!(source.latest_readings(2, Duration::MAX).await.len(), 1);
    }

    #[tokio::test]
    async fn empty_source_returns_nothing() {
        let source = StaticReadings::default();
        assert!(source
            .latest_readings(2, Duration::from_secs(60))
            .await
            .is_empty());
    }
}
