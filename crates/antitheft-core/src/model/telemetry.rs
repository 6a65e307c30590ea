// ── Telemetry snapshot ──
//
// One fully decoded read of the four tracked keys. Snapshots are built
// only by the telemetry decoder and never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

/// Sample timestamps (epoch milliseconds) for each tracked key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SampleTimes {
    pub latitude: i64,
    pub longitude: i64,
    pub armed: i64,
    pub moving: i64,
}

/// The latest value of every tracked key, as reported by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub coordinate: Coordinate,
    pub armed: bool,
    pub moving: bool,
    pub timestamps: SampleTimes,
}

impl TelemetrySnapshot {
    /// The newest sample time across all keys.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        let t = &self.timestamps;
        let newest = t.latitude.max(t.longitude).max(t.armed).max(t.moving);
        DateTime::from_timestamp_millis(newest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observed_at_picks_newest_key() {
        let snap = TelemetrySnapshot {
            coordinate: Coordinate {
                latitude: 45.8,
                longitude: 15.97,
            },
            armed: true,
            moving: false,
            timestamps: SampleTimes {
                latitude: 1_000,
                longitude: 1_000,
                armed: 5_000,
                moving: 2_000,
            },
        };
        assert_eq!(snap.observed_at().map(|t| t.timestamp_millis()), Some(5_000));
    }
}
