//! `arm` / `disarm`: dispatch the command, then optionally wait one
//! confirmation period and poll the device.

use std::sync::Arc;

use antitheft_core::{
    DeviceState, DispatchOutcome, PollOutcome, Tracker, TracingAlertSink,
};
use serde::Serialize;
use tracing::warn;

use crate::cli::{GlobalOpts, SetArmedArgs};
use crate::commands::label_of;
use crate::commands::status::position;
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct ArmReport {
    label: String,
    #[serde(flatten)]
    outcome: DispatchOutcome,
    /// Requested armed state.
    armed: bool,
    /// State read back by the confirmation poll.
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<DeviceState>,
}

impl ArmReport {
    /// `Some(true)` once the platform reports the requested state.
    fn confirmed(&self) -> Option<bool> {
        self.state.as_ref().map(|s| s.armed == self.armed)
    }
}

pub async fn handle(args: SetArmedArgs, armed: bool, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global, args.device.as_deref())?;
    let device = config::select_one(&resolved.tracker, args.device.as_deref())?;
    let confirm_delay = resolved.tracker.confirm_delay;
    let wait = !args.no_confirm;
    let profile = resolved.profile;

    let report = Tracker::oneshot(
        resolved.tracker,
        Arc::new(TracingAlertSink),
        |tracker| async move {
            let outcome = tracker.set_armed(&device, armed).await?;
            let label = label_of(tracker.config(), &device);

            let state = if wait {
                tokio::time::sleep(confirm_delay).await;
                match tracker.refresh_now(&device).await {
                    Ok(PollOutcome::Applied(state)) => Some((*state).clone()),
                    Ok(PollOutcome::Skipped) => None,
                    Err(e) => {
                        warn!(device = %device, error = %e, "confirmation poll failed");
                        None
                    }
                }
            } else {
                None
            };

            Ok(ArmReport {
                label,
                outcome,
                armed,
                state,
            })
        },
    )
    .await
    .map_err(|e| CliError::from(e).for_profile(&profile))?;

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &report,
        |r| detail(r, color),
        |r| r.outcome.method.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(report: &ArmReport, color: bool) -> String {
    let verb = if report.armed { "Armed" } else { "Disarmed" };
    let mut lines = vec![format!(
        "{verb} {} via {}",
        report.label, report.outcome.method
    )];
    if let Some(ref reason) = report.outcome.primary_error {
        lines.push(format!("  rpc failed: {reason}"));
    }
    match (report.confirmed(), &report.state) {
        (Some(true), Some(state)) => lines.push(format!(
            "  confirmed: {}, {} at {}",
            output::armed_label(state.armed, color),
            output::moving_label(state.moving, color),
            position(state),
        )),
        (Some(false), Some(state)) => lines.push(format!(
            "  not yet confirmed: platform still reports {}",
            output::armed_label(state.armed, color),
        )),
        _ => {}
    }
    lines.join("\n")
}
