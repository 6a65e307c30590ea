// Wire models for the platform REST API.
//
// Only the request/response shapes the tracker touches are modelled.
// Everything else the platform returns is ignored.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

/// A single timeseries sample: `{ "ts": <epoch ms>, "value": "<string>" }`.
///
/// The platform documents `value` as a string, but scalar JSON values
/// (booleans, numbers) are accepted and normalised to their string form.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DataPoint {
    pub ts: i64,
    #[serde(deserialize_with = "scalar_as_string")]
    pub value: String,
}

/// Latest-values response: key name → samples. Keys may be absent or
/// map to an empty array.
pub type TimeseriesResponse = HashMap<String, Vec<DataPoint>>;

/// Login request body.
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Login response. Only the access token is consumed; the refresh
/// token the platform also returns is ignored.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Body of a one-way RPC call.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub method: String,
    pub params: serde_json::Map<String, serde_json::Value>,
}

fn scalar_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error as _;

    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a scalar sample value, got {other}"
        ))),
    }
}
