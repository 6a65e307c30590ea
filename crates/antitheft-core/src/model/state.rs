// ── Reconciled device state ──
//
// DeviceState is the externally observable view of one device. It is
// only ever replaced wholesale: `next` derives the successor from a
// snapshot, `with_armed` derives an optimistic successor after a command.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use super::identity::DeviceId;
use super::telemetry::{Coordinate, TelemetrySnapshot};

/// Where the current state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StateSource {
    /// Nothing has been applied yet.
    #[default]
    Initial,
    /// Derived from a decoded telemetry snapshot.
    Telemetry,
    /// Set locally after a dispatched command, awaiting confirmation.
    Optimistic,
}

/// The reconciled view of a tracked device.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceState {
    /// `None` until the first snapshot has been applied.
    pub coordinate: Option<Coordinate>,
    pub armed: bool,
    pub moving: bool,
    /// The `moving` value before the most recent apply.
    pub previous_moving: bool,
    pub observed_at: Option<DateTime<Utc>>,
    pub source: StateSource,
}

impl DeviceState {
    /// Derive the successor state from `snapshot`.
    ///
    /// Returns the new state and whether `moving` rose from `false` to
    /// `true` across this transition.
    pub fn next(&self, snapshot: &TelemetrySnapshot) -> (Self, bool) {
        let edge = snapshot.moving && !self.moving;
        let next = Self {
            coordinate: Some(snapshot.coordinate),
            armed: snapshot.armed,
            moving: snapshot.moving,
            previous_moving: self.moving,
            observed_at: snapshot.observed_at().or(self.observed_at),
            source: StateSource::Telemetry,
        };
        (next, edge)
    }

    /// Derive the optimistic successor after an arm/disarm command.
    /// Movement is left untouched.
    pub fn with_armed(&self, armed: bool) -> Self {
        Self {
            armed,
            source: StateSource::Optimistic,
            ..self.clone()
        }
    }
}

/// Emitted once per false→true transition of a device's `moving` flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementAlert {
    pub device: DeviceId,
    pub coordinate: Coordinate,
    pub observed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SampleTimes;

    fn snapshot(moving: bool) -> TelemetrySnapshot {
        TelemetrySnapshot {
            coordinate: Coordinate {
                latitude: 45.80,
                longitude: 15.97,
            },
            armed: true,
            moving,
            timestamps: SampleTimes::default(),
        }
    }

    #[test]
    fn next_detects_rising_edge_only() {
        let idle = DeviceState::default();
        let (moving, edge) = idle.next(&snapshot(true));
        assert!(edge);
        assert!(moving.moving);
        assert!(!moving.previous_moving);

        let (still_moving, edge) = moving.next(&snapshot(true));
        assert!(!edge);
        assert!(still_moving.previous_moving);

        let (stopped, edge) = still_moving.next(&snapshot(false));
        assert!(!edge);
        assert!(stopped.previous_moving);
        assert!(!stopped.moving);
    }

    #[test]
    fn with_armed_keeps_movement() {
        let (state, _) = DeviceState::default().next(&snapshot(true));
        let optimistic = state.with_armed(false);
        assert!(!optimistic.armed);
        assert!(optimistic.moving);
        assert_eq!(optimistic.source, StateSource::Optimistic);
        assert_eq!(optimistic.coordinate, state.coordinate);
    }
}
