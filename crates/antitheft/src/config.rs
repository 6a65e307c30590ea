//! CLI configuration: thin wrapper around `antitheft_config` shared types.
//!
//! Adds CLI-specific resolution that respects `GlobalOpts` flag overrides
//! (--platform, --username, --insecure, --timeout, --interval).

use antitheft_config::{Config, DeviceEntry, Profile};
use antitheft_core::{DeviceId, TrackerConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Device token variable used when no profile is configured.
pub const DEVICE_TOKEN_ENV: &str = "ANTITHEFT_DEVICE_TOKEN";

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.profile_name(global.profile.as_deref())
}

/// Runtime configuration plus the profile it came from.
pub struct Resolved {
    pub profile: String,
    pub tracker: TrackerConfig,
}

/// Build the tracker configuration from the config file, the active
/// profile, and CLI overrides.
///
/// Without a profile, `--platform` and a device id are enough; the
/// account comes from the environment.
pub fn resolve(global: &GlobalOpts, device: Option<&str>) -> Result<Resolved, CliError> {
    let cfg = antitheft_config::load_config_or_default();
    let name = active_profile_name(global, &cfg);

    let profile = if let Some(profile) = cfg.profiles.get(&name) {
        profile.clone()
    } else if global.profile.is_some() {
        let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
        available.sort();
        return Err(CliError::ProfileNotFound {
            name,
            available: available.join(", "),
        });
    } else {
        let Some(platform) = global.platform.clone() else {
            return Err(CliError::NoConfig {
                path: antitheft_config::config_path().display().to_string(),
            });
        };
        let Some(id) = device else {
            return Err(CliError::Validation {
                field: "device".into(),
                reason: "pass --device when no profile is configured".into(),
            });
        };
        adhoc_profile(platform, id)
    };

    let timeout = global
        .timeout
        .or(profile.timeout)
        .unwrap_or(cfg.defaults.timeout);
    let insecure = global.insecure || profile.insecure.unwrap_or(cfg.defaults.insecure);
    let tracker = resolve_profile(profile, &name, global, timeout, insecure)?;

    Ok(Resolved {
        profile: name,
        tracker,
    })
}

/// Translate a `Profile` + global flags into a `TrackerConfig`.
///
/// CLI flag overrides take priority over profile values.
fn resolve_profile(
    mut profile: Profile,
    profile_name: &str,
    global: &GlobalOpts,
    timeout: u64,
    insecure: bool,
) -> Result<TrackerConfig, CliError> {
    if let Some(ref platform) = global.platform {
        profile.platform.clone_from(platform);
    }
    if global.username.is_some() {
        profile.username.clone_from(&global.username);
    }
    profile.insecure = Some(insecure);
    profile.timeout = Some(timeout);

    let mut config = antitheft_config::profile_to_tracker_config(&profile, profile_name)
        .map_err(|e| CliError::from(e).for_profile(profile_name))?;

    if let Some(interval) = global.interval {
        if interval.is_zero() {
            return Err(CliError::Validation {
                field: "interval".into(),
                reason: "must be greater than zero".into(),
            });
        }
        config.poll_interval = interval;
    }
    Ok(config)
}

fn adhoc_profile(platform: String, device: &str) -> Profile {
    Profile {
        platform,
        auth_header: antitheft_core::AuthHeader::default(),
        username: None,
        password_env: None,
        password: None,
        token: None,
        ca_cert: None,
        insecure: None,
        timeout: None,
        poll_interval_ms: None,
        confirm_delay_ms: None,
        optimistic_updates: true,
        devices: vec![DeviceEntry {
            id: device.into(),
            principal: None,
            label: None,
            token_env: Some(DEVICE_TOKEN_ENV.into()),
            token: None,
        }],
    }
}

/// Pick the devices a command applies to.
///
/// `selector` matches a device id or label. With no selector, every
/// configured device is returned.
pub fn select_devices(
    config: &TrackerConfig,
    selector: Option<&str>,
) -> Result<Vec<DeviceId>, CliError> {
    let Some(selector) = selector else {
        return Ok(config.devices.iter().map(|d| d.id.clone()).collect());
    };

    config
        .devices
        .iter()
        .find(|d| d.id.as_str() == selector || d.label.as_deref() == Some(selector))
        .map(|d| vec![d.id.clone()])
        .ok_or_else(|| CliError::DeviceNotFound {
            identifier: selector.into(),
            available: config
                .devices
                .iter()
                .map(|d| d.display_name().to_owned())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// Pick exactly one device for a command.
pub fn select_one(config: &TrackerConfig, selector: Option<&str>) -> Result<DeviceId, CliError> {
    let mut devices = select_devices(config, selector)?;
    match (devices.pop(), devices.is_empty()) {
        (Some(device), true) => Ok(device),
        _ => Err(CliError::Validation {
            field: "device".into(),
            reason: "profile tracks several devices; pass --device".into(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use antitheft_core::{ServiceAccount, TrackedDevice};
    use secrecy::SecretString;

    use super::*;

    fn tracker_config() -> TrackerConfig {
        let mut bike = TrackedDevice::new("dev-1", "alice");
        bike.label = Some("Bike".into());
        let car = TrackedDevice::new("dev-2", "bob");
        TrackerConfig::new(
            "https://iot.example.com".parse().unwrap(),
            ServiceAccount {
                username: "tenant".into(),
                password: SecretString::from("pw".to_string()),
                token: None,
            },
            vec![bike, car],
        )
    }

    #[test]
    fn selects_by_id_or_label() {
        let config = tracker_config();
        assert_eq!(select_devices(&config, None).unwrap().len(), 2);
        assert_eq!(
            select_devices(&config, Some("Bike")).unwrap(),
            vec![DeviceId::from("dev-1")]
        );
        assert_eq!(
            select_devices(&config, Some("dev-2")).unwrap(),
            vec![DeviceId::from("dev-2")]
        );
    }

    #[test]
    fn unknown_selector_lists_available_devices() {
        let err = select_devices(&tracker_config(), Some("boat")).unwrap_err();
        match err {
            CliError::DeviceNotFound { available, .. } => assert_eq!(available, "Bike, dev-2"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn single_device_requires_selector_when_ambiguous() {
        let config = tracker_config();
        assert!(select_one(&config, None).is_err());
        assert_eq!(
            select_one(&config, Some("Bike")).unwrap(),
            DeviceId::from("dev-1")
        );
    }
}
