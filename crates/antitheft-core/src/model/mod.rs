// ── Domain model ──
//
// Identifiers, decoded telemetry, and the reconciled per-device state.

pub mod identity;
pub mod state;
pub mod telemetry;

pub use identity::{DeviceId, PrincipalId};
pub use state::{DeviceState, MovementAlert, StateSource};
pub use telemetry::{Coordinate, SampleTimes, TelemetrySnapshot};
