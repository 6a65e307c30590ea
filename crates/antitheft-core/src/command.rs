// ── Command dispatch ──
//
// Arm/disarm travel as one-way RPCs. When the RPC channel fails and the
// device has an access token, the command is written as a synthetic
// telemetry point instead. Token rejections are never routed to the
// fallback: they belong to the credential retry in `CredentialStore`.

use antitheft_api::{PlatformClient, RpcRequest};
use chrono::Utc;
use secrecy::SecretString;
use serde::Serialize;
use serde_json::{Map, Value};
use strum::Display;
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::DeviceId;

pub const METHOD_ARM: &str = "armDevice";
pub const METHOD_DISARM: &str = "disarmDevice";

/// A remote instruction for one device.
#[derive(Debug, Clone)]
pub struct Command {
    pub device: DeviceId,
    pub method: String,
    pub params: Map<String, Value>,
}

impl Command {
    pub fn new(device: DeviceId, method: impl Into<String>) -> Self {
        Self {
            device,
            method: method.into(),
            params: Map::new(),
        }
    }

    /// `armDevice` / `disarmDevice`, carrying `{"armed": <bool>}`.
    pub fn set_armed(device: DeviceId, armed: bool) -> Self {
        let method = if armed { METHOD_ARM } else { METHOD_DISARM };
        let mut cmd = Self::new(device, method);
        cmd.params.insert("armed".into(), Value::Bool(armed));
        cmd
    }

    fn rpc_request(&self) -> RpcRequest {
        RpcRequest {
            method: self.method.clone(),
            params: self.params.clone(),
        }
    }

    /// Fallback telemetry body: `{"<method>_timestamp": <epoch ms>, ...params}`.
    fn telemetry_payload(&self, now_ms: i64) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert(format!("{}_timestamp", self.method), Value::from(now_ms));
        body.extend(self.params.clone());
        body
    }
}

/// Which path delivered a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DispatchMethod {
    Rpc,
    Telemetry,
}

/// A successfully delivered command.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub device: DeviceId,
    pub command: String,
    pub method: DispatchMethod,
    /// Why the primary path was abandoned, when the fallback delivered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_error: Option<String>,
}

/// Sends commands to devices.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    api: PlatformClient,
}

impl CommandDispatcher {
    pub fn new(api: PlatformClient) -> Self {
        Self { api }
    }

    /// Deliver `command` over RPC, falling back to a telemetry write once.
    ///
    /// The primary path is not retried here. Success on the primary path
    /// is exactly HTTP 200.
    pub async fn dispatch(
        &self,
        command: &Command,
        token: &SecretString,
        device_token: Option<&SecretString>,
    ) -> Result<DispatchOutcome, CoreError> {
        debug!(device = %command.device, method = %command.method, "dispatching command");

        let primary = match self
            .api
            .send_oneway_rpc(command.device.as_str(), token, &command.rpc_request())
            .await
        {
            Ok(()) => {
                info!(device = %command.device, method = %command.method, "command delivered via rpc");
                return Ok(DispatchOutcome {
                    device: command.device.clone(),
                    command: command.method.clone(),
                    method: DispatchMethod::Rpc,
                    primary_error: None,
                });
            }
            Err(antitheft_api::Error::TokenRejected) => return Err(CoreError::Unauthorized),
            Err(e) => e,
        };

        let status = primary.status();
        let message = primary.to_string();
        warn!(device = %command.device, method = %command.method, error = %primary, "rpc failed");

        let Some(device_token) = device_token else {
            return Err(CoreError::RpcFailed {
                method: command.method.clone(),
                status,
                message,
                fallback: None,
            });
        };

        let body = command.telemetry_payload(Utc::now().timestamp_millis());
        match self.api.post_device_telemetry(device_token, &body).await {
            Ok(()) => {
                info!(device = %command.device, method = %command.method, "command delivered via telemetry fallback");
                Ok(DispatchOutcome {
                    device: command.device.clone(),
                    command: command.method.clone(),
                    method: DispatchMethod::Telemetry,
                    primary_error: Some(message),
                })
            }
            Err(fallback) => {
                warn!(device = %command.device, error = %fallback, "telemetry fallback failed");
                Err(CoreError::RpcFailed {
                    method: command.method.clone(),
                    status,
                    message,
                    fallback: Some(fallback.to_string()),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn set_armed_picks_method_and_params() {
        let arm = Command::set_armed(DeviceId::from("dev-1"), true);
        assert_eq!(arm.method, "armDevice");
        assert_eq!(Value::Object(arm.params.clone()), json!({ "armed": true }));

        let disarm = Command::set_armed(DeviceId::from("dev-1"), false);
        assert_eq!(disarm.method, "disarmDevice");
    }

    #[test]
    fn telemetry_payload_stamps_method() {
        let cmd = Command::set_armed(DeviceId::from("dev-1"), true);
        let body = cmd.telemetry_payload(1_700_000_000_000);
        assert_eq!(
            Value::Object(body),
            json!({ "armDevice_timestamp": 1_700_000_000_000_i64, "armed": true })
        );
    }

    #[test]
    fn dispatch_method_display() {
        assert_eq!(DispatchMethod::Rpc.to_string(), "rpc");
        assert_eq!(DispatchMethod::Telemetry.to_string(), "telemetry");
    }
}
