// antitheft-core: Telemetry synchronization and command dispatch between
// antitheft-api and consumers (CLI or any other UI).

pub mod alert;
pub mod command;
pub mod config;
pub mod credential;
pub mod error;
pub mod model;
pub mod poll;
pub mod reconciler;
pub mod stream;
pub mod telemetry;
pub mod tracker;

// ── Primary re-exports ──────────────────────────────────────────────
pub use alert::{AlertSink, BroadcastAlertSink, TracingAlertSink};
pub use command::{Command, CommandDispatcher, DispatchMethod, DispatchOutcome};
pub use config::{PlatformConfig, ServiceAccount, TlsVerification, TrackedDevice, TrackerConfig};
pub use credential::{Credential, CredentialStore};
pub use error::CoreError;
pub use poll::{PollLoop, PollOutcome, PollPhase, PollReport};
pub use reconciler::StateReconciler;
pub use stream::DeviceStateStream;
pub use telemetry::{TELEMETRY_KEYS, TelemetryClient};
pub use tracker::Tracker;

pub use antitheft_api::AuthHeader;
pub use model::{
    Coordinate, DeviceId, DeviceState, MovementAlert, PrincipalId, SampleTimes, StateSource,
    TelemetrySnapshot,
};
