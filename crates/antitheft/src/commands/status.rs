//! `status`: one manual refresh per device.

use std::sync::Arc;

use antitheft_core::{
    DeviceId, DeviceState, PollOutcome, Tracker, TracingAlertSink, TrackerConfig,
};
use serde::Serialize;
use tabled::Tabled;

use crate::cli::{DeviceArgs, GlobalOpts};
use crate::commands::label_of;
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
pub(crate) struct DeviceStatus {
    pub device: DeviceId,
    pub label: String,
    pub state: DeviceState,
}

impl DeviceStatus {
    pub(crate) fn new(config: &TrackerConfig, device: DeviceId, state: &DeviceState) -> Self {
        Self {
            label: label_of(config, &device),
            device,
            state: state.clone(),
        }
    }
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Device")]
    label: String,
    #[tabled(rename = "Armed")]
    armed: String,
    #[tabled(rename = "Motion")]
    moving: String,
    #[tabled(rename = "Position")]
    position: String,
    #[tabled(rename = "Observed")]
    observed: String,
}

pub(crate) fn position(state: &DeviceState) -> String {
    state
        .coordinate
        .map_or_else(|| "-".into(), |c| c.to_string())
}

pub(crate) fn observed(state: &DeviceState) -> String {
    state.observed_at.map_or_else(
        || "-".into(),
        |t| {
            t.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        },
    )
}

pub async fn handle(args: DeviceArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global, args.device.as_deref())?;
    let devices = config::select_devices(&resolved.tracker, args.device.as_deref())?;
    let profile = resolved.profile;

    let statuses = Tracker::oneshot(
        resolved.tracker,
        Arc::new(TracingAlertSink),
        |tracker| async move {
            let mut out = Vec::with_capacity(devices.len());
            for device in devices {
                let state = match tracker.refresh_now(&device).await? {
                    PollOutcome::Applied(state) => state,
                    PollOutcome::Skipped => tracker.snapshot(&device)?,
                };
                out.push(DeviceStatus::new(tracker.config(), device, &state));
            }
            Ok(out)
        },
    )
    .await
    .map_err(|e| CliError::from(e).for_profile(&profile))?;

    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        &statuses,
        |s| StatusRow {
            label: s.label.clone(),
            armed: output::armed_label(s.state.armed, color),
            moving: output::moving_label(s.state.moving, color),
            position: position(&s.state),
            observed: observed(&s.state),
        },
        |s| {
            format!(
                "{} {} {} {}",
                s.device,
                if s.state.armed { "armed" } else { "disarmed" },
                if s.state.moving { "moving" } else { "still" },
                position(&s.state),
            )
        },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
