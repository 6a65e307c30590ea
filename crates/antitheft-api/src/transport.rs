// HTTP client construction for the telemetry platform.
//
// One `reqwest::Client` serves login, telemetry reads, RPC and the
// device-token write path, so its TLS trust and request timeout apply to
// all four endpoints alike.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;

/// How the platform's server certificate is checked.
#[derive(Debug, Clone, Default)]
pub enum TlsMode {
    /// Trust the system roots (hosted platform instances).
    #[default]
    System,
    /// Trust one extra root from a PEM file (private-CA deployments).
    CustomCa(PathBuf),
    /// Skip verification. Only for a self-hosted platform on a
    /// self-signed certificate, since bearer tokens are then exposed to
    /// anyone who can intercept the connection.
    DangerAcceptInvalid,
}

/// TLS and timeout settings for the platform connection.
///
/// `timeout` bounds a whole request, so a stalled telemetry read fails
/// as a transport error instead of holding the poll gate.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::default(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build the client shared by every principal and device.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("antitheft/", env!("CARGO_PKG_VERSION")));

        let builder = match &self.tls {
            TlsMode::System => builder,
            TlsMode::CustomCa(path) => builder.add_root_certificate(read_ca(path)?),
            TlsMode::DangerAcceptInvalid => builder.danger_accept_invalid_certs(true),
        };

        builder
            .build()
            .map_err(|e| Error::Tls(format!("cannot build platform client: {e}")))
    }
}

fn read_ca(path: &Path) -> Result<reqwest::Certificate, Error> {
    let pem = std::fs::read(path)
        .map_err(|e| Error::Tls(format!("cannot read CA certificate {}: {e}", path.display())))?;
    reqwest::Certificate::from_pem(&pem)
        .map_err(|e| Error::Tls(format!("{} is not a PEM certificate: {e}", path.display())))
}
