// ── State reconciler ──
//
// Owns the single DeviceState of one device and publishes it through a
// `watch` channel. Every apply is a read-modify-write under the channel's
// lock, so `moving` and `previous_moving` always change together.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tracing::debug;

use crate::alert::AlertSink;
use crate::model::{DeviceId, DeviceState, MovementAlert, TelemetrySnapshot};
use crate::stream::DeviceStateStream;

pub struct StateReconciler {
    device: DeviceId,
    state: watch::Sender<Arc<DeviceState>>,
    sink: Arc<dyn AlertSink>,
}

impl StateReconciler {
    pub fn new(device: DeviceId, sink: Arc<dyn AlertSink>) -> Self {
        let (state, _) = watch::channel(Arc::new(DeviceState::default()));
        Self {
            device,
            state,
            sink,
        }
    }

    pub fn device(&self) -> &DeviceId {
        &self.device
    }

    /// Apply a decoded snapshot.
    ///
    /// If `moving` rose from `false` to `true`, exactly one alert is
    /// delivered to the sink before this returns.
    pub fn apply(&self, snapshot: &TelemetrySnapshot) -> Arc<DeviceState> {
        let mut alert = None;
        self.state.send_modify(|current| {
            let (next, edge) = current.next(snapshot);
            if edge {
                alert = Some(MovementAlert {
                    device: self.device.clone(),
                    coordinate: snapshot.coordinate,
                    observed_at: snapshot.observed_at().unwrap_or_else(Utc::now),
                });
            }
            *current = Arc::new(next);
        });

        if let Some(alert) = alert {
            debug!(device = %self.device, "movement edge detected");
            self.sink.notify_movement_started(&alert);
        }
        self.current()
    }

    /// Set `armed` locally ahead of confirmation. The next applied
    /// snapshot overrides it.
    pub fn apply_optimistic(&self, armed: bool) -> Arc<DeviceState> {
        self.state.send_modify(|current| {
            *current = Arc::new(current.with_armed(armed));
        });
        debug!(device = %self.device, armed, "optimistic state applied");
        self.current()
    }

    pub fn current(&self) -> Arc<DeviceState> {
        Arc::clone(&self.state.borrow())
    }

    pub fn subscribe(&self) -> DeviceStateStream {
        DeviceStateStream::new(self.state.subscribe())
    }
}
