// ── Core error types ──
//
// The failure taxonomy seen by consumers of the tracker. Raw HTTP
// statuses and JSON errors from antitheft-api are folded into these
// variants by the `From<antitheft_api::Error>` impl below.

use thiserror::Error;

use crate::model::{DeviceId, PrincipalId};

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Remote read/write errors ─────────────────────────────────────
    /// Connectivity failure or a non-success HTTP status.
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        status: Option<u16>,
    },

    /// Telemetry payload missing a required key or carrying an
    /// unparseable value.
    #[error("Decode error: {message}")]
    Decode { message: String },

    // ── Credential errors ────────────────────────────────────────────
    /// No credential has been issued or seeded for this principal.
    #[error("No credential for principal {principal}")]
    Unauthenticated { principal: PrincipalId },

    /// The platform rejected a bearer token. Consumed by
    /// [`CredentialStore::authorized`](crate::CredentialStore::authorized),
    /// which turns a repeat rejection into [`CoreError::AuthFailed`].
    #[error("Authorization rejected by platform")]
    Unauthorized,

    /// Login with the service credentials was rejected, or a call was
    /// rejected again after a fresh login.
    #[error("Authentication failed: {message}")]
    AuthFailed { message: String },

    // ── Command errors ───────────────────────────────────────────────
    /// The primary RPC path did not return HTTP 200, and the fallback
    /// path was unavailable or failed too.
    #[error(
        "Command {method} failed: {message}{}",
        .fallback.as_ref().map(|f| format!(" (fallback: {f})")).unwrap_or_default()
    )]
    RpcFailed {
        method: String,
        status: Option<u16>,
        message: String,
        fallback: Option<String>,
    },

    // ── Tracker errors ───────────────────────────────────────────────
    #[error("Device not tracked: {device}")]
    UnknownDevice { device: DeviceId },

    #[error("Tracker is not running")]
    NotRunning,

    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// `true` for a bearer-token rejection that a credential refresh may cure.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// `true` for failures that stop a poll loop instead of being retried
    /// on the next tick.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            Self::Unauthenticated { .. } | Self::Unauthorized | Self::AuthFailed { .. }
        )
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } | Self::RpcFailed { status, .. } => *status,
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<antitheft_api::Error> for CoreError {
    fn from(err: antitheft_api::Error) -> Self {
        let status = err.status();
        match err {
            antitheft_api::Error::Authentication { message } => CoreError::AuthFailed { message },
            antitheft_api::Error::TokenRejected => CoreError::Unauthorized,
            antitheft_api::Error::Transport(e) => CoreError::Transport {
                message: e.to_string(),
                status,
            },
            antitheft_api::Error::Tls(message) => CoreError::Transport {
                message: format!("TLS error: {message}"),
                status: None,
            },
            antitheft_api::Error::Api { status, message } => CoreError::Transport {
                message: format!("HTTP {status}: {message}"),
                status: Some(status),
            },
            antitheft_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            antitheft_api::Error::Deserialization { message, body: _ } => {
                CoreError::Decode { message }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_rejection_maps_to_unauthorized() {
        let err = CoreError::from(antitheft_api::Error::TokenRejected);
        assert!(err.is_unauthorized());
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn api_status_maps_to_transport() {
        let err = CoreError::from(antitheft_api::Error::Api {
            status: 502,
            message: "bad gateway".into(),
        });
        assert!(matches!(err, CoreError::Transport { status: Some(502), .. }));
        assert!(!err.is_auth());
    }

    #[test]
    fn rpc_failure_message_includes_fallback() {
        let err = CoreError::RpcFailed {
            method: "armDevice".into(),
            status: Some(504),
            message: "HTTP 504: Device is offline".into(),
            fallback: Some("HTTP 401: Unauthorized".into()),
        };
        assert_eq!(
            err.to_string(),
            "Command armDevice failed: HTTP 504: Device is offline (fallback: HTTP 401: Unauthorized)"
        );
    }
}
