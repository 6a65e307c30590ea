// ── Telemetry client ──
//
// Reads the latest value of the four tracked keys and decodes them into
// a `TelemetrySnapshot`. Decoding is all-or-nothing: one bad key fails
// the whole snapshot.

use antitheft_api::{DataPoint, PlatformClient, TimeseriesResponse};
use secrecy::SecretString;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{Coordinate, DeviceId, SampleTimes, TelemetrySnapshot};

pub const KEY_LATITUDE: &str = "latitude";
pub const KEY_LONGITUDE: &str = "longitude";
pub const KEY_ARMED: &str = "armed";
pub const KEY_MOTION: &str = "motion_detected";

/// The fixed key set requested on every poll.
pub const TELEMETRY_KEYS: [&str; 4] = [KEY_LATITUDE, KEY_LONGITUDE, KEY_ARMED, KEY_MOTION];

/// Reads device telemetry from the platform.
#[derive(Debug, Clone)]
pub struct TelemetryClient {
    api: PlatformClient,
}

impl TelemetryClient {
    pub fn new(api: PlatformClient) -> Self {
        Self { api }
    }

    /// Fetch and decode the latest snapshot for `device`.
    ///
    /// A rejected token surfaces as [`CoreError::Unauthorized`] so the
    /// caller can refresh and retry.
    pub async fn fetch_latest(
        &self,
        device: &DeviceId,
        token: &SecretString,
    ) -> Result<TelemetrySnapshot, CoreError> {
        let raw = self
            .api
            .latest_timeseries(device.as_str(), token, &TELEMETRY_KEYS)
            .await?;
        let snapshot = decode_snapshot(&raw)?;
        debug!(device = %device, armed = snapshot.armed, moving = snapshot.moving, "telemetry decoded");
        Ok(snapshot)
    }
}

/// Decode a timeseries response into a snapshot.
pub fn decode_snapshot(raw: &TimeseriesResponse) -> Result<TelemetrySnapshot, CoreError> {
    let latitude = latest(raw, KEY_LATITUDE)?;
    let longitude = latest(raw, KEY_LONGITUDE)?;
    let armed = latest(raw, KEY_ARMED)?;
    let moving = latest(raw, KEY_MOTION)?;

    Ok(TelemetrySnapshot {
        coordinate: Coordinate {
            latitude: parse_degrees(KEY_LATITUDE, &latitude.value)?,
            longitude: parse_degrees(KEY_LONGITUDE, &longitude.value)?,
        },
        armed: parse_flag(KEY_ARMED, &armed.value)?,
        moving: parse_flag(KEY_MOTION, &moving.value)?,
        timestamps: SampleTimes {
            latitude: latitude.ts,
            longitude: longitude.ts,
            armed: armed.ts,
            moving: moving.ts,
        },
    })
}

/// The sample with the largest timestamp. Array order is not trusted.
fn latest<'a>(raw: &'a TimeseriesResponse, key: &str) -> Result<&'a DataPoint, CoreError> {
    raw.get(key)
        .and_then(|samples| samples.iter().max_by_key(|p| p.ts))
        .ok_or_else(|| CoreError::Decode {
            message: format!("missing value for `{key}`"),
        })
}

fn parse_flag(key: &str, value: &str) -> Result<bool, CoreError> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(CoreError::Decode {
            message: format!("`{key}` is not a boolean: {value:?}"),
        })
    }
}

fn parse_degrees(key: &str, value: &str) -> Result<f64, CoreError> {
    match value.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(CoreError::Decode {
            message: format!("`{key}` is not a decimal number: {value:?}"),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn response(json: &str) -> TimeseriesResponse {
        serde_json::from_str(json).unwrap()
    }

    const FULL: &str = r#"{
        "latitude": [{"ts": 1, "value": "45.80"}],
        "longitude": [{"ts": 1, "value": "15.97"}],
        "armed": [{"ts": 1, "value": "true"}],
        "motion_detected": [{"ts": 1, "value": "false"}]
    }"#;

    #[test]
    fn decodes_complete_payload() {
        let snap = decode_snapshot(&response(FULL)).unwrap();
        assert_eq!(
            snap.coordinate,
            Coordinate {
                latitude: 45.80,
                longitude: 15.97
            }
        );
        assert!(snap.armed);
        assert!(!snap.moving);
    }

    #[test]
    fn latest_timestamp_wins_regardless_of_order() {
        let raw = response(
            r#"{
            "latitude": [{"ts": 1, "value": "45.80"}],
            "longitude": [{"ts": 1, "value": "15.97"}],
            "armed": [{"ts": 9, "value": "false"}, {"ts": 5, "value": "true"}],
            "motion_detected": [{"ts": 1, "value": "false"}]
        }"#,
        );
        let snap = decode_snapshot(&raw).unwrap();
        assert!(!snap.armed);
        assert_eq!(snap.timestamps.armed, 9);

        let ascending = response(
            r#"{
            "latitude": [{"ts": 1, "value": "45.80"}],
            "longitude": [{"ts": 1, "value": "15.97"}],
            "armed": [{"ts": 5, "value": "true"}, {"ts": 9, "value": "false"}],
            "motion_detected": [{"ts": 1, "value": "false"}]
        }"#,
        );
        assert!(!decode_snapshot(&ascending).unwrap().armed);
    }

    #[test]
    fn flags_are_case_insensitive() {
        let raw = response(
            r#"{
            "latitude": [{"ts": 1, "value": "0"}],
            "longitude": [{"ts": 1, "value": "0"}],
            "armed": [{"ts": 1, "value": "TRUE"}],
            "motion_detected": [{"ts": 1, "value": "False"}]
        }"#,
        );
        let snap = decode_snapshot(&raw).unwrap();
        assert!(snap.armed);
        assert!(!snap.moving);
    }

    #[test]
    fn missing_or_empty_key_is_decode_error() {
        let missing = response(
            r#"{
            "latitude": [{"ts": 1, "value": "45.80"}],
            "longitude": [{"ts": 1, "value": "15.97"}],
            "armed": [{"ts": 1, "value": "true"}]
        }"#,
        );
        assert!(matches!(decode_snapshot(&missing), Err(CoreError::Decode { .. })));

        let empty = response(
            r#"{
            "latitude": [{"ts": 1, "value": "45.80"}],
            "longitude": [],
            "armed": [{"ts": 1, "value": "true"}],
            "motion_detected": [{"ts": 1, "value": "false"}]
        }"#,
        );
        assert!(matches!(decode_snapshot(&empty), Err(CoreError::Decode { .. })));
    }

    #[test]
    fn bad_values_are_decode_errors() {
        for (key, bad) in [
            ("latitude", "north"),
            ("longitude", "NaN"),
            ("armed", "yes"),
            ("motion_detected", "1"),
        ] {
            let mut raw = response(FULL);
            raw.insert(
                key.to_string(),
                vec![DataPoint {
                    ts: 2,
                    value: bad.to_string(),
                }],
            );
            assert!(
                matches!(decode_snapshot(&raw), Err(CoreError::Decode { .. })),
                "{key}={bad} should not decode"
            );
        }
    }
}
