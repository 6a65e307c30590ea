// ── Tracker ──
//
// Lifecycle management for a set of tracked devices: credential
// bootstrap, one cancellable poll task per device, command dispatch with
// optimistic update and confirmation poll, and reactive state access.

use std::future::Future;
use std::sync::Arc;

use antitheft_api::transport::{TlsMode, TransportConfig};
use antitheft_api::PlatformClient;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::alert::AlertSink;
use crate::command::{Command, CommandDispatcher, DispatchOutcome};
use crate::config::{TlsVerification, TrackerConfig};
use crate::credential::CredentialStore;
use crate::error::CoreError;
use crate::model::{DeviceId, DeviceState};
use crate::poll::{PollLoop, PollOutcome, PollReport};
use crate::reconciler::StateReconciler;
use crate::stream::DeviceStateStream;
use crate::telemetry::TelemetryClient;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<TrackerInner>`. Devices are independent:
/// each has its own reconciler, poll loop and task, and they share only
/// the credential store.
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    config: TrackerConfig,
    credentials: Arc<CredentialStore>,
    dispatcher: CommandDispatcher,
    loops: Vec<Arc<PollLoop>>,
    cancel: CancellationToken,
    /// Child token for the current run. Cancelled on stop and replaced so
    /// the tracker can be started again.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    running: watch::Sender<bool>,
}

impl Tracker {
    /// Build a tracker from configuration. Performs no I/O -- call
    /// [`start()`](Self::start) to log in and begin polling.
    pub fn new(config: TrackerConfig, sink: Arc<dyn AlertSink>) -> Result<Self, CoreError> {
        config.validate()?;

        let api = PlatformClient::new(
            config.platform.url.as_str(),
            config.platform.auth_header,
            &build_transport(&config),
        )?;
        let credentials = Arc::new(CredentialStore::new(api.clone(), config.account.clone()));
        let telemetry = TelemetryClient::new(api.clone());

        let loops = config
            .devices
            .iter()
            .map(|device| {
                let reconciler = Arc::new(StateReconciler::new(device.id.clone(), Arc::clone(&sink)));
                Arc::new(PollLoop::new(
                    device.clone(),
                    telemetry.clone(),
                    Arc::clone(&credentials),
                    reconciler,
                ))
            })
            .collect();

        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();
        let (running, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(TrackerInner {
                dispatcher: CommandDispatcher::new(api),
                config,
                credentials,
                loops,
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
                running,
            }),
        })
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.inner.config
    }

    /// Tracked device ids in configuration order.
    pub fn devices(&self) -> Vec<DeviceId> {
        self.inner.loops.iter().map(|l| l.device().id.clone()).collect()
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Obtain a credential for every principal.
    ///
    /// A configured service-account token is seeded as-is; otherwise the
    /// service account logs in once per principal. A rejected login is a
    /// hard failure.
    pub async fn authenticate(&self) -> Result<(), CoreError> {
        let config = &self.inner.config;
        for principal in config.principals() {
            if let Some(token) = &config.account.token {
                self.inner.credentials.seed(&principal, token.clone());
            } else {
                self.inner.credentials.refresh(&principal).await?;
            }
        }
        Ok(())
    }

    /// Authenticate and spawn one poll task per device.
    ///
    /// Calling `start` on a running tracker is a no-op.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.is_running() {
            return Ok(());
        }
        self.authenticate().await?;

        let child = self.inner.cancel_child.lock().await.clone();
        let period = self.inner.config.poll_interval;
        let mut handles = self.inner.task_handles.lock().await;
        for poll in &self.inner.loops {
            let poll = Arc::clone(poll);
            handles.push(tokio::spawn(poll.run(period, child.clone())));
        }

        self.inner.running.send_replace(true);
        info!(devices = self.inner.loops.len(), ?period, "tracker started");
        Ok(())
    }

    /// Cancel every task and wait for them to finish.
    pub async fn stop(&self) {
        {
            let mut child = self.inner.cancel_child.lock().await;
            child.cancel();
            *child = self.inner.cancel.child_token();
        }

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        self.inner.running.send_replace(false);
        debug!("tracker stopped");
    }

    pub fn is_running(&self) -> bool {
        *self.inner.running.borrow()
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: authenticate, run closure, stop.
    ///
    /// Optimized for CLI use: no background polling is started.
    pub async fn oneshot<F, Fut, T>(
        config: TrackerConfig,
        sink: Arc<dyn AlertSink>,
        f: F,
    ) -> Result<T, CoreError>
    where
        F: FnOnce(Tracker) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let tracker = Tracker::new(config, sink)?;
        tracker.authenticate().await?;
        let result = f(tracker.clone()).await;
        tracker.stop().await;
        result
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Run one poll for `device` now, outside the timer.
    pub async fn refresh_now(&self, device: &DeviceId) -> Result<PollOutcome, CoreError> {
        self.poll_loop(device)?.refresh_now().await
    }

    /// Subscribe to `device`'s reconciled state.
    pub fn state(&self, device: &DeviceId) -> Result<DeviceStateStream, CoreError> {
        Ok(self.poll_loop(device)?.reconciler().subscribe())
    }

    /// Current reconciled state of `device`.
    pub fn snapshot(&self, device: &DeviceId) -> Result<Arc<DeviceState>, CoreError> {
        Ok(self.poll_loop(device)?.reconciler().current())
    }

    /// Subscribe to `device`'s poll health.
    pub fn poll_report(&self, device: &DeviceId) -> Result<watch::Receiver<PollReport>, CoreError> {
        Ok(self.poll_loop(device)?.report())
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Arm or disarm `device`.
    ///
    /// On success the commanded state is applied optimistically (if
    /// enabled), and while the tracker is running a confirmation poll is
    /// scheduled after `confirm_delay`. On failure the state is unchanged.
    pub async fn set_armed(
        &self,
        device: &DeviceId,
        armed: bool,
    ) -> Result<DispatchOutcome, CoreError> {
        let poll = self.poll_loop(device)?;
        let target = poll.device();
        let command = Command::set_armed(target.id.clone(), armed);
        let dispatcher = &self.inner.dispatcher;
        let command_ref = &command;
        let device_token = target.device_token.as_ref();

        let outcome = self
            .inner
            .credentials
            .authorized(&target.principal, |token| async move {
                dispatcher.dispatch(command_ref, &token, device_token).await
            })
            .await?;

        if self.inner.config.optimistic_updates {
            poll.reconciler().apply_optimistic(armed);
        }
        if self.is_running() {
            self.schedule_confirmation(Arc::clone(poll)).await;
        }
        Ok(outcome)
    }

    async fn schedule_confirmation(&self, poll: Arc<PollLoop>) {
        let delay = self.inner.config.confirm_delay;
        let cancel = self.inner.cancel_child.lock().await.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let result = tokio::select! {
                        biased;
                        () = cancel.cancelled() => return,
                        result = poll.refresh_now() => result,
                    };
                    match result {
                        Ok(PollOutcome::Applied(_)) => {
                            debug!(device = %poll.device().id, "command confirmed by poll");
                        }
                        Ok(PollOutcome::Skipped) => {
                            debug!(device = %poll.device().id, "confirmation poll skipped, cycle in flight");
                        }
                        Err(e) => {
                            warn!(device = %poll.device().id, error = %e, "confirmation poll failed");
                        }
                    }
                }
            }
        });

        let mut handles = self.inner.task_handles.lock().await;
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    fn poll_loop(&self, device: &DeviceId) -> Result<&Arc<PollLoop>, CoreError> {
        self.inner
            .loops
            .iter()
            .find(|l| &l.device().id == device)
            .ok_or_else(|| CoreError::UnknownDevice {
                device: device.clone(),
            })
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn build_transport(config: &TrackerConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.platform.tls),
        timeout: config.platform.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
