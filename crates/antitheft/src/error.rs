//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use antitheft_config::ConfigError;
use antitheft_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const COMMAND: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Platform request failed: {message}")]
    #[diagnostic(
        code(antitheft::connection_failed),
        help(
            "Check that the platform URL is reachable.\n\
             Self-signed certificate? Try --insecure (-k) or set ca_cert in your profile."
        )
    )]
    ConnectionFailed { message: String },

    #[error("Telemetry could not be decoded: {message}")]
    #[diagnostic(
        code(antitheft::decode),
        help("The device may not have reported all of latitude, longitude, armed and moving yet.")
    )]
    Decode { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(antitheft::auth_failed),
        help(
            "Verify the service account credentials.\n\
             Run: antitheft config set-password --profile {profile}"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(antitheft::no_credentials),
        help(
            "Set username in the profile (or ANTITHEFT_USERNAME) and store a password with:\n\
             antitheft config set-password --profile {profile}\n\
             Or set the ANTITHEFT_PASSWORD environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── Commands ─────────────────────────────────────────────────────
    #[error("{0}")]
    #[diagnostic(
        code(antitheft::command_failed),
        help("The device did not accept the command and no fallback path delivered it.")
    )]
    CommandFailed(String),

    // ── Resources ────────────────────────────────────────────────────
    #[error("Device '{identifier}' not found")]
    #[diagnostic(
        code(antitheft::not_found),
        help("Tracked devices: {available}")
    )]
    DeviceNotFound {
        identifier: String,
        available: String,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(antitheft::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(antitheft::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration file not found")]
    #[diagnostic(
        code(antitheft::no_config),
        help(
            "Create a profile at: {path}\n\
             Or pass --platform, --username and --device on the command line."
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(antitheft::config))]
    Config(ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    #[diagnostic(code(antitheft::json))]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    #[diagnostic(code(antitheft::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Decode { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::DeviceNotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            Self::CommandFailed(_) => exit_code::COMMAND,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the active profile name to errors that mention it.
    pub fn for_profile(self, name: &str) -> Self {
        match self {
            Self::AuthFailed { message, .. } => Self::AuthFailed {
                profile: name.into(),
                message,
            },
            Self::NoCredentials { .. } => Self::NoCredentials {
                profile: name.into(),
            },
            other => other,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Transport { message, .. } => CliError::ConnectionFailed { message },

            CoreError::Decode { message } => CliError::Decode { message },

            CoreError::Unauthenticated { principal } => CliError::AuthFailed {
                profile: "default".into(),
                message: format!("no credential for principal {principal}"),
            },

            CoreError::Unauthorized => CliError::AuthFailed {
                profile: "default".into(),
                message: "token rejected by platform".into(),
            },

            CoreError::AuthFailed { message } => CliError::AuthFailed {
                profile: "default".into(),
                message,
            },

            err @ CoreError::RpcFailed { .. } => CliError::CommandFailed(err.to_string()),

            CoreError::UnknownDevice { device } => CliError::DeviceNotFound {
                identifier: device.to_string(),
                available: String::new(),
            },

            CoreError::NotRunning => CliError::Validation {
                field: "tracker".into(),
                reason: "not running".into(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(other),
        }
    }
}
