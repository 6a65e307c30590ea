//! Command dispatch: bridges CLI args -> tracker operations -> output formatting.

pub mod arm;
pub mod config_cmd;
pub mod status;
pub mod watch;

use antitheft_core::{DeviceId, TrackerConfig};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a platform-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Status(args) => status::handle(args, global).await,
        Command::Watch(args) => watch::handle(args, global).await,
        Command::Arm(args) => arm::handle(args, true, global).await,
        Command::Disarm(args) => arm::handle(args, false, global).await,
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(_) => Err(CliError::Validation {
            field: "command".into(),
            reason: "completions are generated before dispatch".into(),
        }),
    }
}

/// Display label of a tracked device.
pub(crate) fn label_of(config: &TrackerConfig, device: &DeviceId) -> String {
    config
        .devices
        .iter()
        .find(|d| &d.id == device)
        .map_or_else(|| device.to_string(), |d| d.display_name().to_owned())
}
