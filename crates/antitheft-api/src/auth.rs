// Tenant authentication
//
// Username/password login against `POST /api/auth/login`, returning the
// bearer token, plus the header style used to present that token.

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::PlatformClient;
use crate::error::Error;
use crate::models::{LoginRequest, LoginResponse};

const LOGIN_PATH: &str = "api/auth/login";

/// Which header carries the bearer token.
///
/// The platform's own web clients send `X-Authorization: Bearer <jwt>`;
/// deployments behind a proxy that forwards the standard header can use
/// `Authorization: Bearer <jwt>` instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthHeader {
    #[default]
    XAuthorization,
    Authorization,
}

impl AuthHeader {
    /// The header name for this style.
    pub fn name(self) -> HeaderName {
        match self {
            Self::XAuthorization => HeaderName::from_static("x-authorization"),
            Self::Authorization => AUTHORIZATION,
        }
    }

    /// Build the sensitive `Bearer <token>` header value.
    pub(crate) fn bearer(token: &SecretString) -> Result<HeaderValue, Error> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .map_err(|e| Error::Authentication {
                message: format!("invalid token header value: {e}"),
            })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl PlatformClient {
    /// Authenticate the tenant service account and return a fresh token.
    ///
    /// Only 400, 401 and 403 mean the credentials were rejected and are
    /// reported as [`Error::Authentication`]. Any other non-success status
    /// is an [`Error::Api`], since the identity provider may just be down.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<SecretString, Error> {
        let url = self.url(LOGIN_PATH)?;
        debug!("logging in at {}", url);

        let body = LoginRequest {
            username,
            password: password.expose_secret(),
        };

        let resp = self.http().post(url).json(&body).send().await?;

        let status = resp.status();
        if matches!(
            status,
            StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("login rejected (HTTP {status}): {}", preview(&body)),
            });
        }
        if !status.is_success() {
            return Err(Self::parse_error(status, resp).await);
        }

        let body = resp.text().await?;
        let login: LoginResponse =
            serde_json::from_str(&body).map_err(|e| Error::Authentication {
                message: format!("malformed login response: {e}"),
            })?;

        if login.token.is_empty() {
            return Err(Error::Authentication {
                message: "login response carried an empty token".into(),
            });
        }

        debug!("login successful");
        Ok(SecretString::from(login.token))
    }
}

/// Truncate a response body for error messages.
pub(crate) fn preview(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_match_style() {
        assert_eq!(AuthHeader::XAuthorization.name().as_str(), "x-authorization");
        assert_eq!(AuthHeader::Authorization.name().as_str(), "authorization");
    }

    #[test]
    fn bearer_value_is_sensitive() {
        let token = SecretString::from("abc.def".to_string());
        let value = AuthHeader::bearer(&token).expect("valid header");
        assert!(value.is_sensitive());
        assert_eq!(value.to_str().expect("ascii"), "Bearer abc.def");
    }

    #[test]
    fn preview_truncates_long_bodies() {
        let body = "x".repeat(500);
        assert_eq!(preview(&body).len(), 200);
        assert_eq!(preview("short"), "short");
    }
}
