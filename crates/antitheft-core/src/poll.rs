// ── Poll loop ──
//
// Drives fetch → apply for one device. Timer ticks, manual refreshes and
// confirmation polls all pass through the same gate; a trigger that finds
// a cycle in flight is dropped, never queued.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use tokio::sync::{Mutex, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::TrackedDevice;
use crate::credential::CredentialStore;
use crate::error::CoreError;
use crate::model::DeviceState;
use crate::reconciler::StateReconciler;
use crate::telemetry::TelemetryClient;

/// Where a device's poll cycle currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PollPhase {
    #[default]
    Idle,
    Polling,
    Applying,
    /// The last cycle failed; the next tick tries again.
    Failed,
}

/// Health of a device's polling, for staleness display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollReport {
    pub phase: PollPhase,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

/// Result of one trigger.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// A snapshot was fetched and applied.
    Applied(Arc<DeviceState>),
    /// Another cycle was in flight; nothing was fetched.
    Skipped,
}

pub struct PollLoop {
    device: TrackedDevice,
    telemetry: TelemetryClient,
    credentials: Arc<CredentialStore>,
    reconciler: Arc<StateReconciler>,
    gate: Mutex<()>,
    report: watch::Sender<PollReport>,
}

impl PollLoop {
    pub fn new(
        device: TrackedDevice,
        telemetry: TelemetryClient,
        credentials: Arc<CredentialStore>,
        reconciler: Arc<StateReconciler>,
    ) -> Self {
        let (report, _) = watch::channel(PollReport::default());
        Self {
            device,
            telemetry,
            credentials,
            reconciler,
            gate: Mutex::new(()),
            report,
        }
    }

    pub fn device(&self) -> &TrackedDevice {
        &self.device
    }

    pub fn reconciler(&self) -> &Arc<StateReconciler> {
        &self.reconciler
    }

    pub fn report(&self) -> watch::Receiver<PollReport> {
        self.report.subscribe()
    }

    /// Run one fetch → apply cycle out of band.
    ///
    /// Returns [`PollOutcome::Skipped`] if a cycle is already in flight.
    /// Errors are returned to the caller and recorded in the report; the
    /// current state is left untouched on failure.
    pub async fn refresh_now(&self) -> Result<PollOutcome, CoreError> {
        let Ok(_guard) = self.gate.try_lock() else {
            debug!(device = %self.device.id, "poll in flight, trigger dropped");
            return Ok(PollOutcome::Skipped);
        };

        self.set_phase(PollPhase::Polling);
        let telemetry = &self.telemetry;
        let id = &self.device.id;
        let fetched = self
            .credentials
            .authorized(&self.device.principal, |token| async move {
                telemetry.fetch_latest(id, &token).await
            })
            .await;

        match fetched {
            Ok(snapshot) => {
                self.set_phase(PollPhase::Applying);
                let state = self.reconciler.apply(&snapshot);
                self.report.send_modify(|r| {
                    r.phase = PollPhase::Idle;
                    r.last_success = Some(Utc::now());
                    r.last_error = None;
                    r.consecutive_failures = 0;
                });
                Ok(PollOutcome::Applied(state))
            }
            Err(e) => {
                self.report.send_modify(|r| {
                    r.phase = PollPhase::Failed;
                    r.last_error = Some(e.to_string());
                    r.consecutive_failures = r.consecutive_failures.saturating_add(1);
                });
                Err(e)
            }
        }
    }

    /// Poll every `period` until `cancel` fires.
    ///
    /// Failures are recorded in the report and the loop carries on; a
    /// device whose credentials are rejected stays stale until a later
    /// tick succeeds. Each tick still refreshes the token at most once.
    pub async fn run(self: Arc<Self>, period: Duration, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let started = Instant::now();
                    // Cancellation abandons an in-flight fetch without applying it.
                    let result = tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        result = self.refresh_now() => result,
                    };
                    if started.elapsed() >= period {
                        // Ticks that fell due during a slow cycle are dropped.
                        interval.reset();
                    }

                    match result {
                        Ok(_) => {}
                        Err(e) if e.is_auth() => {
                            error!(device = %self.device.id, error = %e, "poll not authorized");
                        }
                        Err(e) => {
                            warn!(device = %self.device.id, error = %e, "poll failed");
                        }
                    }
                }
            }
        }

        self.set_phase(PollPhase::Idle);
        debug!(device = %self.device.id, "poll loop stopped");
    }

    fn set_phase(&self, phase: PollPhase) {
        self.report.send_modify(|r| r.phase = phase);
    }
}
