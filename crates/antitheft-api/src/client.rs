// Platform HTTP client
//
// Wraps `reqwest::Client` with URL construction, bearer-header injection,
// and status classification for the tracker's endpoints. The login flow
// lives in `auth.rs` as an inherent method on the same type.

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::auth::{AuthHeader, preview};
use crate::error::Error;
use crate::models::{RpcRequest, TimeseriesResponse};
use crate::transport::TransportConfig;

/// Async client for the telemetry platform's REST API.
///
/// Holds no credentials of its own: bearer tokens and device tokens are
/// passed per call so that a single client can be shared by every
/// principal and device.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    base_url: Url,
    auth_header: AuthHeader,
}

impl PlatformClient {
    /// Build a client for the platform at `base_url`.
    pub fn new(
        base_url: &str,
        auth_header: AuthHeader,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let base_url = Url::parse(base_url)?;
        Ok(Self::with_client(http, base_url, auth_header))
    }

    /// Wrap a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url, auth_header: AuthHeader) -> Self {
        Self {
            http,
            base_url,
            auth_header,
        }
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Append percent-encoded path segments to the base URL.
    ///
    /// Keeps any path prefix the base URL already carries (reverse-proxy
    /// deployments mount the platform under a sub-path).
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Build a URL from a static `/`-separated path.
    pub(crate) fn url(&self, path: &str) -> Result<Url, Error> {
        let segments: Vec<&str> = path.split('/').collect();
        self.endpoint(&segments)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// Fetch the latest samples for `keys` on a device.
    ///
    /// `GET /api/plugins/telemetry/DEVICE/{deviceId}/values/timeseries?keys=…`
    pub async fn latest_timeseries(
        &self,
        device_id: &str,
        token: &SecretString,
        keys: &[&str],
    ) -> Result<TimeseriesResponse, Error> {
        let url = self.endpoint(&[
            "api",
            "plugins",
            "telemetry",
            "DEVICE",
            device_id,
            "values",
            "timeseries",
        ])?;
        debug!("GET {url} keys={keys:?}");

        let resp = self
            .http
            .get(url)
            .header(self.auth_header.name(), AuthHeader::bearer(token)?)
            .query(&[("keys", keys.join(","))])
            .send()
            .await?;

        Self::handle_response(resp).await
    }

    /// Send a one-way RPC to a device.
    ///
    /// `POST /api/plugins/rpc/oneway/{deviceId}`. Only HTTP 200 counts as
    /// delivered; every other status is returned as an error.
    pub async fn send_oneway_rpc(
        &self,
        device_id: &str,
        token: &SecretString,
        request: &RpcRequest,
    ) -> Result<(), Error> {
        let url = self.endpoint(&["api", "plugins", "rpc", "oneway", device_id])?;
        debug!(method = %request.method, "POST {url}");

        let resp = self
            .http
            .post(url)
            .header(self.auth_header.name(), AuthHeader::bearer(token)?)
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::OK {
            return Ok(());
        }
        Err(Self::parse_error(status, resp).await)
    }

    /// Write a telemetry point with device-token auth.
    ///
    /// `POST /api/v1/{deviceToken}/telemetry`. The token is part of the
    /// path, so the URL is never logged.
    pub async fn post_device_telemetry<B: Serialize + Sync>(
        &self,
        device_token: &SecretString,
        body: &B,
    ) -> Result<(), Error> {
        let url = self.endpoint(&["api", "v1", device_token.expose_secret(), "telemetry"])?;
        debug!("POST device telemetry");

        // reqwest errors embed the request URL; strip it so the token stays out of logs.
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Transport(e.without_url()))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        Err(Self::parse_error(status, resp).await)
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, Error> {
        let status = resp.status();
        if !status.is_success() {
            return Err(Self::parse_error(status, resp).await);
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body,
        })
    }

    pub(crate) async fn parse_error(status: StatusCode, resp: reqwest::Response) -> Error {
        if status == StatusCode::UNAUTHORIZED {
            return Error::TokenRejected;
        }
        let body = resp.text().await.unwrap_or_default();
        Error::Api {
            status: status.as_u16(),
            message: if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown status").to_owned()
            } else {
                preview(&body).to_owned()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> PlatformClient {
        PlatformClient::with_client(
            reqwest::Client::new(),
            Url::parse(base).expect("valid base"),
            AuthHeader::default(),
        )
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let c = client("https://tb.example.com/iot/");
        let url = c.url("api/auth/login").expect("valid url");
        assert_eq!(url.as_str(), "https://tb.example.com/iot/api/auth/login");
    }

    #[test]
    fn endpoint_without_trailing_slash() {
        let c = client("https://tb.example.com:8080");
        let url = c.endpoint(&["api", "plugins", "rpc", "oneway", "dev-1"]).expect("valid url");
        assert_eq!(url.as_str(), "https://tb.example.com:8080/api/plugins/rpc/oneway/dev-1");
    }

    #[test]
    fn endpoint_percent_encodes_segments() {
        let c = client("https://tb.example.com/");
        let url = c.endpoint(&["api", "v1", "a/b c", "telemetry"]).expect("valid url");
        assert_eq!(url.path(), "/api/v1/a%2Fb%20c/telemetry");
    }
}
