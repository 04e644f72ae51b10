//! HTTP transport capability and its hyper-based default.

use async_trait::async_trait;
use bytes::Bytes;
use checkaccess_sdk::TransportError;
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};

/// Sends one HTTP request and returns the buffered response.
///
/// Implementations do not retry or authenticate; the client's pipeline does.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// # Errors
    ///
    /// Returns [`TransportError`] when no HTTP response was received.
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError>;
}

/// Pooled hyper client over rustls with the platform's native roots.
///
/// Plain `http://` endpoints are accepted as well.
#[derive(Clone)]
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransport {
    #[must_use]
    pub fn new() -> Self {
        if rustls::crypto::CryptoProvider::get_default().is_none() {
            // Losing the race to another installer is fine.
            rustls::crypto::aws_lc_rs::default_provider()
                .install_default()
                .ok();
        }

        let mut roots = rustls::RootCertStore::empty();
        let native = rustls_native_certs::load_native_certs();
        for err in &native.errors {
            warn!(error = %err, "failed to load a native root certificate");
        }
        let (added, ignored) = roots.add_parsable_certificates(native.certs);
        debug!(added, ignored, "loaded native root certificates");

        let tls = rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls)
            .https_or_http()
            .enable_http1()
            .build();

        Self {
            client: Client::builder(TokioExecutor::new()).build(connector),
        }
    }
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl HttpTransport for HyperTransport {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let response = self
            .client
            .request(request.map(Full::new))
            .await
            .map_err(|e| {
                if e.is_connect() {
                    TransportError::Connect(error_chain(&e))
                } else {
                    TransportError::Other(error_chain(&e))
                }
            })?;

        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TransportError::Other(format!("failed to read response body: {e}")))?
            .to_bytes();

        Ok(Response::from_parts(parts, body))
    }
}

/// `e` followed by its sources, `: `-separated.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("outer")]
    struct Outer(#[source] Inner);

    #[derive(Debug, thiserror::Error)]
    #[error("inner")]
    struct Inner;

    #[test]
    fn error_chain_includes_sources() {
        assert_eq!(error_chain(&Outer(Inner)), "outer: inner");
    }

    #[tokio::test]
    async fn unreachable_host_is_a_connect_error() {
        let transport = HyperTransport::new();
        let request = Request::post("http://127.0.0.1:1/checkAccess")
            .body(Bytes::new())
            .unwrap();

        let err = transport.send(request).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "got {err:?}");
        assert!(err.is_transient());
    }
}
