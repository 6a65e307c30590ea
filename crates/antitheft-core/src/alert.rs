// ── Alert sinks ──
//
// Receivers of "movement started" events. Delivery is fire-and-forget:
// the reconciler calls the sink once per rising edge and ignores what
// happens next.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::warn;

use crate::model::MovementAlert;

const ALERT_CHANNEL_SIZE: usize = 64;

/// Receives movement-started events.
pub trait AlertSink: Send + Sync {
    fn notify_movement_started(&self, alert: &MovementAlert);
}

impl<F> AlertSink for F
where
    F: Fn(&MovementAlert) + Send + Sync,
{
    fn notify_movement_started(&self, alert: &MovementAlert) {
        self(alert);
    }
}

/// Logs each alert at `warn` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn notify_movement_started(&self, alert: &MovementAlert) {
        warn!(
            device = %alert.device,
            latitude = alert.coordinate.latitude,
            longitude = alert.coordinate.longitude,
            observed_at = %alert.observed_at,
            "movement started"
        );
    }
}

/// Fans alerts out to any number of subscribers.
///
/// Alerts sent while nobody is subscribed are dropped.
#[derive(Debug, Clone)]
pub struct BroadcastAlertSink {
    tx: broadcast::Sender<Arc<MovementAlert>>,
}

impl BroadcastAlertSink {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(ALERT_CHANNEL_SIZE);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<MovementAlert>> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastAlertSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertSink for BroadcastAlertSink {
    fn notify_movement_started(&self, alert: &MovementAlert) {
        let _ = self.tx.send(Arc::new(alert.clone()));
    }
}
