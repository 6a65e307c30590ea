// ── Runtime tracker configuration ──
//
// These types describe which platform to talk to, which service account
// to log in with, and which devices to track. They carry secrets but
// never touch disk: antitheft-config (or a test) builds a
// `TrackerConfig` and hands it to `Tracker::new`.

use std::collections::HashSet;
use std::time::Duration;

use antitheft_api::AuthHeader;
use secrecy::SecretString;
use url::Url;

use crate::error::CoreError;
use crate::model::{DeviceId, PrincipalId};

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-hosted platform with a self-signed cert).
    DangerAcceptInvalid,
}

/// Where the platform lives and how to reach it.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Platform base URL (e.g., `https://iot.example.com`).
    pub url: Url,
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Header used to present bearer tokens.
    pub auth_header: AuthHeader,
}

/// Tenant service account shared by every principal.
#[derive(Debug, Clone)]
pub struct ServiceAccount {
    pub username: String,
    pub password: SecretString,
    /// Pre-issued bearer token. When set, it is seeded for every
    /// principal on start and login only happens after a rejection.
    pub token: Option<SecretString>,
}

/// One device to observe and control.
#[derive(Debug, Clone)]
pub struct TrackedDevice {
    pub id: DeviceId,
    /// Principal whose credential is used for this device.
    pub principal: PrincipalId,
    /// Human-readable label for output.
    pub label: Option<String>,
    /// Device access token for the fallback telemetry write. Without it,
    /// a failed RPC is reported without a fallback attempt.
    pub device_token: Option<SecretString>,
}

impl TrackedDevice {
    pub fn new(id: impl Into<DeviceId>, principal: impl Into<PrincipalId>) -> Self {
        Self {
            id: id.into(),
            principal: principal.into(),
            label: None,
            device_token: None,
        }
    }

    /// Label if set, otherwise the device id.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(self.id.as_str())
    }
}

/// Complete configuration for a [`Tracker`](crate::Tracker).
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub platform: PlatformConfig,
    pub account: ServiceAccount,
    pub devices: Vec<TrackedDevice>,
    /// Poll period per device.
    pub poll_interval: Duration,
    /// Delay between a dispatched command and its confirmation poll.
    pub confirm_delay: Duration,
    /// Apply the commanded armed state locally before the platform confirms it.
    pub optimistic_updates: bool,
}

impl TrackerConfig {
    pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
    pub const DEFAULT_CONFIRM_DELAY: Duration = Duration::from_secs(1);
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Configuration with default timing for the given platform and account.
    pub fn new(url: Url, account: ServiceAccount, devices: Vec<TrackedDevice>) -> Self {
        Self {
            platform: PlatformConfig {
                url,
                tls: TlsVerification::default(),
                timeout: Self::DEFAULT_TIMEOUT,
                auth_header: AuthHeader::default(),
            },
            account,
            devices,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
            confirm_delay: Self::DEFAULT_CONFIRM_DELAY,
            optimistic_updates: true,
        }
    }

    /// Reject configurations the tracker cannot run.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.devices.is_empty() {
            return Err(CoreError::Config {
                message: "no devices configured".into(),
            });
        }
        if self.poll_interval.is_zero() {
            return Err(CoreError::Config {
                message: "poll interval must be greater than zero".into(),
            });
        }
        if self.account.username.is_empty() {
            return Err(CoreError::Config {
                message: "service account username is empty".into(),
            });
        }
        let mut seen = HashSet::new();
        for device in &self.devices {
            if !seen.insert(&device.id) {
                return Err(CoreError::Config {
                    message: format!("device {} configured twice", device.id),
                });
            }
        }
        Ok(())
    }

    /// Distinct principals in configuration order.
    pub fn principals(&self) -> Vec<PrincipalId> {
        let mut out: Vec<PrincipalId> = Vec::new();
        for device in &self.devices {
            if !out.contains(&device.principal) {
                out.push(device.principal.clone());
            }
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(devices: Vec<TrackedDevice>) -> TrackerConfig {
        TrackerConfig::new(
            "https://iot.example.com".parse().unwrap(),
            ServiceAccount {
                username: "tenant@example.com".into(),
                password: SecretString::from("pw".to_string()),
                token: None,
            },
            devices,
        )
    }

    #[test]
    fn defaults_poll_once_per_second() {
        let cfg = config(vec![TrackedDevice::new("dev-1", "alice")]);
        assert_eq!(cfg.poll_interval, Duration::from_secs(1));
        assert_eq!(cfg.confirm_delay, Duration::from_secs(1));
        assert!(cfg.optimistic_updates);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_duplicate_devices() {
        let cfg = config(vec![
            TrackedDevice::new("dev-1", "alice"),
            TrackedDevice::new("dev-1", "bob"),
        ]);
        assert!(matches!(cfg.validate(), Err(CoreError::Config { .. })));
    }

    #[test]
    fn rejects_empty_device_list_and_zero_interval() {
        assert!(config(Vec::new()).validate().is_err());

        let mut cfg = config(vec![TrackedDevice::new("dev-1", "alice")]);
        cfg.poll_interval = Duration::ZERO;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn principals_are_deduplicated_in_order() {
        let cfg = config(vec![
            TrackedDevice::new("dev-1", "alice"),
            TrackedDevice::new("dev-2", "bob"),
            TrackedDevice::new("dev-3", "alice"),
        ]);
        let names: Vec<String> = cfg.principals().iter().map(ToString::to_string).collect();
        assert_eq!(names, ["alice", "bob"]);
    }
}
