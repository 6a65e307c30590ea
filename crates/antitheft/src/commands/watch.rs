//! `watch`: run the tracker and print every state change and movement
//! alert until interrupted.

use std::sync::Arc;

use antitheft_core::{
    AlertSink, BroadcastAlertSink, DeviceId, DeviceState, MovementAlert, StateSource, Tracker,
};
use chrono::Local;
use owo_colors::OwoColorize;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::{StreamExt, StreamMap};
use tracing::{debug, warn};

use crate::cli::{DeviceArgs, GlobalOpts};
use crate::commands::label_of;
use crate::commands::status::{observed, position};
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WatchEvent<'a> {
    State {
        device: &'a DeviceId,
        label: String,
        state: &'a DeviceState,
    },
    MovementStarted {
        label: String,
        #[serde(flatten)]
        alert: &'a MovementAlert,
    },
}

pub async fn handle(args: DeviceArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global, args.device.as_deref())?;
    let devices = config::select_devices(&resolved.tracker, args.device.as_deref())?;
    let profile = resolved.profile;

    let sink = Arc::new(BroadcastAlertSink::new());
    let mut alerts = sink.subscribe();
    let tracker = Tracker::new(resolved.tracker, Arc::clone(&sink) as Arc<dyn AlertSink>)?;

    let mut states = StreamMap::new();
    for device in &devices {
        states.insert(device.clone(), tracker.state(device)?.into_stream());
    }

    tracker
        .start()
        .await
        .map_err(|e| CliError::from(e).for_profile(&profile))?;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let color = output::should_color(&global.color);
    let result = loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("interrupted");
                break Ok(());
            }
            Some((device, state)) = states.next() => {
                // The value present at subscription time carries no telemetry.
                if state.source == StateSource::Initial {
                    continue;
                }
                let event = WatchEvent::State {
                    device: &device,
                    label: label_of(tracker.config(), &device),
                    state: &state,
                };
                print_event(global, &event, color)?;
            }
            alert = alerts.recv() => match alert {
                Ok(alert) => {
                    let event = WatchEvent::MovementStarted {
                        label: label_of(tracker.config(), &alert.device),
                        alert: &alert,
                    };
                    print_event(global, &event, color)?;
                }
                Err(RecvError::Lagged(missed)) => warn!(missed, "alert feed lagged"),
                Err(RecvError::Closed) => break Ok(()),
            },
        }
    };

    tracker.stop().await;
    result
}

fn print_event(global: &GlobalOpts, event: &WatchEvent<'_>, color: bool) -> Result<(), CliError> {
    let out = output::render_event(&global.output, event, |e| line(e, color))?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn line(event: &WatchEvent<'_>, color: bool) -> String {
    match event {
        WatchEvent::State { label, state, .. } => {
            let marker = if state.source == StateSource::Optimistic {
                " (pending)"
            } else {
                ""
            };
            format!(
                "[{}] {label}  {}{marker}  {}  {}",
                observed(state),
                output::armed_label(state.armed, color),
                output::moving_label(state.moving, color),
                position(state),
            )
        }
        WatchEvent::MovementStarted { label, alert } => {
            let time = alert
                .observed_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S");
            let headline = format!("ALERT {label} started moving");
            let headline = if color {
                headline.red().bold().to_string()
            } else {
                headline
            };
            format!("[{time}] {headline} at {}", alert.coordinate)
        }
    }
}
