//! Configuration for the antitheft CLI.
//!
//! TOML profiles, secret resolution (env + keyring + plaintext), and
//! translation to `antitheft_core::TrackerConfig`. The CLI layers its
//! flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use antitheft_core::{AuthHeader, ServiceAccount, TlsVerification, TrackedDevice, TrackerConfig};
use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Keyring service name for every stored secret.
pub const KEYRING_SERVICE: &str = "antitheft";

pub const PASSWORD_ENV: &str = "ANTITHEFT_PASSWORD";
pub const USERNAME_ENV: &str = "ANTITHEFT_USERNAME";
pub const TOKEN_ENV: &str = "ANTITHEFT_TOKEN";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named platform profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use: explicit choice, then `default_profile`.
    pub fn profile_name(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound { name: name.into() })
    }

    /// Copy of the config with every plaintext secret masked, for display.
    pub fn redacted(&self) -> Self {
        let mut out = self.clone();
        for profile in out.profiles.values_mut() {
            mask(&mut profile.password);
            mask(&mut profile.token);
            for device in &mut profile.devices {
                mask(&mut device.token);
            }
        }
        out
    }

    /// Render the config as TOML, in the same shape the file is read in.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

const REDACTED: &str = "********";

fn mask(secret: &mut Option<String>) {
    if secret.is_some() {
        *secret = Some(REDACTED.into());
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

/// A named platform profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Platform base URL (e.g., "https://iot.example.com").
    pub platform: String,

    /// Bearer header style: "x-authorization" or "authorization".
    #[serde(default)]
    pub auth_header: AuthHeader,

    /// Service account user name.
    pub username: Option<String>,

    /// Environment variable holding the service account password.
    pub password_env: Option<String>,

    /// Service account password (plaintext; prefer keyring or env var).
    pub password: Option<String>,

    /// Pre-issued bearer token (plaintext; prefer keyring or env var).
    pub token: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    pub timeout: Option<u64>,

    /// Poll period in milliseconds.
    pub poll_interval_ms: Option<u64>,

    /// Delay before the confirmation poll after a command, in milliseconds.
    pub confirm_delay_ms: Option<u64>,

    /// Show the commanded state before the platform confirms it.
    #[serde(default = "default_true")]
    pub optimistic_updates: bool,

    /// Devices to track.
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

/// One tracked device in a profile.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceEntry {
    /// Platform device id.
    pub id: String,

    /// Principal the device belongs to. Defaults to the profile name.
    pub principal: Option<String>,

    /// Display label.
    pub label: Option<String>,

    /// Environment variable holding the device access token.
    pub token_env: Option<String>,

    /// Device access token (plaintext; prefer keyring or env var).
    pub token: Option<String>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "antitheft", "antitheft").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("antitheft");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
///
/// Nested keys are reachable from the environment with a double
/// underscore, e.g. `ANTITHEFT_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("ANTITHEFT_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Secret resolution ───────────────────────────────────────────────

fn keyring_entry(profile_name: &str, key: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/{key}"))?)
}

/// Look a secret up in: env var → system keyring → plaintext value.
fn resolve_secret(
    env_name: Option<&str>,
    profile_name: &str,
    keyring_key: &str,
    plaintext: Option<&String>,
) -> Option<SecretString> {
    // 1. Environment
    if let Some(val) = env_name.and_then(|name| std::env::var(name).ok()) {
        return Some(SecretString::from(val));
    }

    // 2. System keyring
    if let Some(secret) = keyring_entry(profile_name, keyring_key)
        .ok()
        .and_then(|e| e.get_password().ok())
    {
        return Some(SecretString::from(secret));
    }

    // 3. Plaintext in config
    plaintext.map(|s| SecretString::from(s.clone()))
}

/// Store the service account password in the system keyring.
pub fn store_password(profile_name: &str, password: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name, "password")?.set_password(password)?;
    Ok(())
}

/// Store a device access token in the system keyring.
pub fn store_device_token(profile_name: &str, device_id: &str, token: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name, &format!("device/{device_id}"))?.set_password(token)?;
    Ok(())
}

/// Resolve the service account (user name, password, optional token).
pub fn resolve_account(profile: &Profile, profile_name: &str) -> Result<ServiceAccount, ConfigError> {
    let username = profile
        .username
        .clone()
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .ok_or_else(|| ConfigError::NoCredentials {
            profile: profile_name.into(),
        })?;

    let password_env = profile.password_env.as_deref().unwrap_or(PASSWORD_ENV);
    let password = resolve_secret(
        Some(password_env),
        profile_name,
        "password",
        profile.password.as_ref(),
    );
    let token = resolve_secret(Some(TOKEN_ENV), profile_name, "token", profile.token.as_ref());

    // A pre-issued token alone is enough to start; a later refresh then
    // fails with an authentication error instead of at load time.
    let password = match (password, &token) {
        (Some(pw), _) => pw,
        (None, Some(_)) => SecretString::from(String::new()),
        (None, None) => {
            return Err(ConfigError::NoCredentials {
                profile: profile_name.into(),
            });
        }
    };

    Ok(ServiceAccount {
        username,
        password,
        token,
    })
}

fn resolve_device(entry: &DeviceEntry, profile_name: &str) -> TrackedDevice {
    let principal = entry.principal.as_deref().unwrap_or(profile_name);
    let mut device = TrackedDevice::new(entry.id.as_str(), principal);
    device.label.clone_from(&entry.label);
    device.device_token = resolve_secret(
        entry.token_env.as_deref(),
        profile_name,
        &format!("device/{}", entry.id),
        entry.token.as_ref(),
    );
    device
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `TrackerConfig` from a profile, without CLI flag overrides.
pub fn profile_to_tracker_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<TrackerConfig, ConfigError> {
    let url: url::Url = profile
        .platform
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "platform".into(),
            reason: format!("invalid URL: {}", profile.platform),
        })?;

    if profile.devices.is_empty() {
        return Err(ConfigError::Validation {
            field: "devices".into(),
            reason: format!("profile '{profile_name}' lists no devices"),
        });
    }

    let account = resolve_account(profile, profile_name)?;
    let devices = profile
        .devices
        .iter()
        .map(|d| resolve_device(d, profile_name))
        .collect();

    let mut config = TrackerConfig::new(url, account, devices);
    config.platform.auth_header = profile.auth_header;
    config.platform.tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };
    if let Some(secs) = profile.timeout {
        config.platform.timeout = Duration::from_secs(secs);
    }
    if let Some(ms) = profile.poll_interval_ms {
        config.poll_interval = positive_millis("poll_interval_ms", ms)?;
    }
    if let Some(ms) = profile.confirm_delay_ms {
        config.confirm_delay = Duration::from_millis(ms);
    }
    config.optimistic_updates = profile.optimistic_updates;

    Ok(config)
}

fn positive_millis(field: &str, ms: u64) -> Result<Duration, ConfigError> {
    if ms == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(Duration::from_millis(ms))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    const SAMPLE: &str = r#"
default_profile = "home"

[defaults]
output = "json"

[profiles.home]
platform = "https://iot.example.com"
auth_header = "authorization"
username = "tenant@example.com"
password = "plain-pw"
poll_interval_ms = 2000
confirm_delay_ms = 500
optimistic_updates = false

[[profiles.home.devices]]
id = "353caeb0-416f-11f0-a544-db21b46190ed"
principal = "alice"
label = "Bike"
token = "dev-token"

[[profiles.home.devices]]
id = "4a1b2c3d-0000-11f0-a544-db21b46190ed"
"#;

    fn load(contents: &str) -> Config {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        load_config_from(&path).unwrap()
    }

    #[test]
    fn loads_profiles_and_defaults() {
        let cfg = load(SAMPLE);
        assert_eq!(cfg.profile_name(None), "home");
        assert_eq!(cfg.profile_name(Some("other")), "other");
        assert_eq!(cfg.defaults.output, "json");
        assert_eq!(cfg.defaults.timeout, 30);

        let profile = cfg.profile("home").unwrap();
        assert_eq!(profile.devices.len(), 2);
        assert_eq!(profile.auth_header, AuthHeader::Authorization);
        assert!(cfg.profile("missing").is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn translates_profile_to_tracker_config() {
        let cfg = load(SAMPLE);
        let tracker = profile_to_tracker_config(cfg.profile("home").unwrap(), "home").unwrap();

        assert_eq!(tracker.platform.url.as_str(), "https://iot.example.com/");
        assert_eq!(tracker.platform.auth_header, AuthHeader::Authorization);
        assert_eq!(tracker.platform.tls, TlsVerification::SystemDefaults);
        assert_eq!(tracker.poll_interval, Duration::from_secs(2));
        assert_eq!(tracker.confirm_delay, Duration::from_millis(500));
        assert!(!tracker.optimistic_updates);

        let first = &tracker.devices[0];
        assert_eq!(first.principal.as_str(), "alice");
        assert_eq!(first.display_name(), "Bike");
        assert!(first.device_token.is_some());

        // Principal defaults to the profile name.
        assert_eq!(tracker.devices[1].principal.as_str(), "home");
    }

    #[test]
    fn rejects_invalid_url_and_zero_interval() {
        let mut cfg = load(SAMPLE);
        let profile = cfg.profiles.get_mut("home").unwrap();
        profile.platform = "not a url".into();
        assert!(matches!(
            profile_to_tracker_config(profile, "home"),
            Err(ConfigError::Validation { .. })
        ));

        profile.platform = "https://iot.example.com".into();
        profile.poll_interval_ms = Some(0);
        assert!(matches!(
            profile_to_tracker_config(profile, "home"),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn rejects_profile_without_devices() {
        let mut cfg = load(SAMPLE);
        let profile = cfg.profiles.get_mut("home").unwrap();
        profile.devices.clear();
        assert!(profile_to_tracker_config(profile, "home").is_err());
    }

    #[test]
    fn redacted_masks_plaintext_secrets() {
        let cfg = load(SAMPLE).redacted();
        let profile = cfg.profile("home").unwrap();
        assert_eq!(profile.password.as_deref(), Some("********"));
        assert_eq!(profile.token, None);
        assert_eq!(profile.devices[0].token.as_deref(), Some("********"));
        assert_eq!(profile.devices[1].token, None);
        assert_eq!(profile.username.as_deref(), Some("tenant@example.com"));
    }

    #[test]
    fn redacted_toml_reloads_without_secrets() {
        let text = load(SAMPLE).redacted().to_toml().unwrap();
        assert!(!text.contains("plain-pw"));
        assert!(!text.contains("dev-token"));

        let reloaded = load(&text);
        let profile = reloaded.profile("home").unwrap();
        assert_eq!(profile.devices.len(), 2);
        assert_eq!(profile.poll_interval_ms, Some(2000));
        assert_eq!(profile.password.as_deref(), Some("********"));
    }

    #[test]
    fn plaintext_password_is_last_resort() {
        let cfg = load(SAMPLE);
        let account = resolve_account(cfg.profile("home").unwrap(), "home-test-no-keyring").unwrap();
        assert_eq!(account.username, "tenant@example.com");
        assert!(!account.password.expose_secret().is_empty());
    }
}
