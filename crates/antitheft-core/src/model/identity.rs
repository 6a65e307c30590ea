// ── Identity types ──
//
// Opaque identifiers for tracked devices and the principals that
// observe them. Both are platform-assigned strings (device UUIDs,
// user names); the newtypes keep them from being mixed up.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ── DeviceId ────────────────────────────────────────────────────────

/// Platform identifier of a tracked device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ── PrincipalId ─────────────────────────────────────────────────────

/// The identity under which telemetry is read and commands are issued.
///
/// Each principal owns one credential in the
/// [`CredentialStore`](crate::CredentialStore).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn device_id_round_trips_through_display() {
        let id: DeviceId = "353caeb0-416f-11f0-a544-db21b46190ed".parse().unwrap();
        assert_eq!(id.to_string(), "353caeb0-416f-11f0-a544-db21b46190ed");
    }

    #[test]
    fn ids_serialize_as_bare_strings() {
        let json = serde_json::to_string(&PrincipalId::from("alice")).unwrap();
        assert_eq!(json, "\"alice\"");
    }
}
