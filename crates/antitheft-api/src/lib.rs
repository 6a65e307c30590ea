// antitheft-api: Async Rust client for the telemetry platform REST API
//
// One parametrized client covers every endpoint the tracker needs:
// tenant login, timeseries reads, one-way RPC, and the device-token
// telemetry write used as the command fallback path.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use auth::AuthHeader;
pub use client::PlatformClient;
pub use error::Error;
pub use models::{DataPoint, LoginResponse, RpcRequest, TimeseriesResponse};
pub use transport::{TlsMode, TransportConfig};
