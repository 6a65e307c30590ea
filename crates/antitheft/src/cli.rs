//! Clap derive structures for the `antitheft` CLI.

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// antitheft -- track, arm and disarm anti-theft devices
#[derive(Debug, Parser)]
#[command(
    name = "antitheft",
    version,
    about = "Track, arm and disarm anti-theft devices from the command line",
    long_about = "Polls device telemetry (position, armed, moving) from the IoT platform,\n\
        raises an alert when a device starts moving, and sends arm/disarm\n\
        commands with a telemetry fallback when the device is unreachable.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "ANTITHEFT_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Platform base URL (overrides profile)
    #[arg(long, env = "ANTITHEFT_PLATFORM", global = true)]
    pub platform: Option<String>,

    /// Service account user name (overrides profile)
    #[arg(long, short = 'u', env = "ANTITHEFT_USERNAME", global = true)]
    pub username: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ANTITHEFT_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "ANTITHEFT_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds [default: 30]
    #[arg(long, env = "ANTITHEFT_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Poll period, e.g. "1s" or "500ms" (overrides profile)
    #[arg(long, env = "ANTITHEFT_INTERVAL", value_parser = humantime::parse_duration, global = true)]
    pub interval: Option<Duration>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll each device once and print its state
    Status(DeviceArgs),

    /// Follow device state and movement alerts until interrupted
    Watch(DeviceArgs),

    /// Arm a device
    Arm(SetArmedArgs),

    /// Disarm a device
    Disarm(SetArmedArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct DeviceArgs {
    /// Limit to one device (id or label); defaults to every device in the profile
    #[arg(long, short = 'd')]
    pub device: Option<String>,
}

#[derive(Debug, Args)]
pub struct SetArmedArgs {
    /// Device id or label; may be omitted when the profile tracks one device
    #[arg(long, short = 'd')]
    pub device: Option<String>,

    /// Return right after dispatch instead of waiting for a confirming poll
    #[arg(long)]
    pub no_confirm: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display the configuration with secrets masked
    Show,

    /// Store the service account password in the system keyring
    SetPassword,

    /// Store a device access token in the system keyring
    SetDeviceToken {
        /// Device id
        device: String,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
