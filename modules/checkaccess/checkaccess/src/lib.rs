#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! CheckAccess client
//!
//! Concrete [`RemotePdpClient`](checkaccess_sdk::RemotePdpClient) for the
//! remote CheckAccess endpoint:
//!
//! - [`RemotePdpClientImpl`] - validated client, built from parts or from [`PdpClientConfig`]
//! - [`HttpTransport`] / [`HyperTransport`] - pluggable transport and its hyper default
//! - [`StaticTokenCredential`] - fixed bearer token, for operators and tests
//!
//! Every call goes through one pipeline: bearer authentication, telemetry
//! headers (`User-Agent`, `x-ms-client-request-id`) and retries with
//! exponential backoff.

pub mod client;
pub mod config;
pub mod credential;
mod pipeline;
pub mod transport;

pub use client::{ClientOptions, RemotePdpClientImpl};
pub use config::{ConfigLoadError, ENV_PREFIX, PdpClientConfig, RetryConfig};
pub use credential::StaticTokenCredential;
pub use pipeline::CLIENT_REQUEST_ID;
pub use transport::{HttpTransport, HyperTransport};
