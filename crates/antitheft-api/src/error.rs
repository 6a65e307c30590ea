use thiserror::Error;

/// Top-level error type for the `antitheft-api` crate.
///
/// Covers every failure mode of the platform REST surface: login,
/// bearer-token rejection, transport, non-success HTTP status, and
/// payload decoding. `antitheft-core` maps these into its own taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login was rejected (wrong service credentials, locked account, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A bearer-authenticated call came back with HTTP 401.
    #[error("Token rejected -- re-authentication required")]
    TokenRejected,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Platform ────────────────────────────────────────────────────
    /// The platform answered with an unexpected HTTP status.
    #[error("Platform API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the platform rejected the bearer token and a
    /// fresh login might resolve it.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::TokenRejected)
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::TokenRejected => Some(401),
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
