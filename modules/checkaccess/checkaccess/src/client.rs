//! Concrete [`RemotePdpClient`] over the request pipeline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use checkaccess_sdk::{
    AuthorizationDecisionResponse, AuthorizationRequest, CallContext, ConfigError, PdpClientError,
    RemotePdpClient, TokenCredential, TransportError,
};
use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Method, Response, Uri};
use tracing::debug;
use url::Url;

use crate::config::{PdpClientConfig, RetryConfig};
use crate::pipeline::Pipeline;
use crate::transport::{HttpTransport, HyperTransport};

const APPLICATION_JSON: &str = "application/json";

/// Pipeline settings for [`RemotePdpClientImpl`].
#[derive(Clone, Default)]
pub struct ClientOptions {
    pub retry: RetryConfig,
    /// Limit for a single attempt; the per-call limit lives in [`CallContext`].
    pub try_timeout: Option<Duration>,
    /// Prepended to the `User-Agent` header.
    pub application_id: Option<String>,
    /// Transport override. Defaults to [`HyperTransport`].
    pub transport: Option<Arc<dyn HttpTransport>>,
}

impl ClientOptions {
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn with_try_timeout(mut self, timeout: Duration) -> Self {
        self.try_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_application_id(mut self, application_id: impl Into<String>) -> Self {
        self.application_id = Some(application_id.into());
        self
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }
}

impl From<&PdpClientConfig> for ClientOptions {
    fn from(config: &PdpClientConfig) -> Self {
        Self {
            retry: config.retry.clone(),
            try_timeout: config.try_timeout(),
            application_id: config.application_id.clone(),
            transport: None,
        }
    }
}

impl std::fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("retry", &self.retry)
            .field("try_timeout", &self.try_timeout)
            .field("application_id", &self.application_id)
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

/// Client for the remote CheckAccess endpoint.
///
/// Immutable once built; share it behind an `Arc` across tasks.
pub struct RemotePdpClientImpl {
    endpoint: String,
    uri: Uri,
    pipeline: Pipeline,
}

impl RemotePdpClientImpl {
    /// Validate the configuration and assemble the pipeline.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidEndpoint`] if `endpoint` is blank or not an absolute http(s) URL
    /// - [`ConfigError::InvalidScope`] if `scope` is blank
    /// - [`ConfigError::MissingCredential`] if `credential` is `None`
    pub fn new(
        endpoint: &str,
        scope: &str,
        credential: Option<Arc<dyn TokenCredential>>,
        options: ClientOptions,
    ) -> Result<Self, ConfigError> {
        let uri = parse_endpoint(endpoint)?;
        if scope.trim().is_empty() {
            return Err(ConfigError::InvalidScope {
                scope: scope.to_owned(),
            });
        }
        let Some(credential) = credential else {
            return Err(ConfigError::MissingCredential);
        };

        let transport = options
            .transport
            .unwrap_or_else(|| Arc::new(HyperTransport::new()));
        let pipeline = Pipeline::new(
            transport,
            credential,
            scope.to_owned(),
            options.retry,
            options.try_timeout,
            options.application_id.as_deref(),
        );

        debug!(endpoint, scope, "CheckAccess client created");
        Ok(Self {
            endpoint: endpoint.to_owned(),
            uri,
            pipeline,
        })
    }

    /// Build a client from loaded configuration.
    ///
    /// # Errors
    ///
    /// See [`RemotePdpClientImpl::new`].
    pub fn from_config(
        config: &PdpClientConfig,
        credential: Option<Arc<dyn TokenCredential>>,
    ) -> Result<Self, ConfigError> {
        Self::new(
            &config.endpoint,
            &config.scope,
            credential,
            ClientOptions::from(config),
        )
    }

    /// Endpoint as given at construction.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn round_trip(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationDecisionResponse, PdpClientError> {
        let body = serde_json::to_vec(request)
            .map_err(|e| PdpClientError::RequestEncode(e.to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
        headers.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));

        let response = self
            .pipeline
            .send(&Method::POST, &self.uri, headers, &Bytes::from(body))
            .await?;
        decode_response(response)
    }
}

impl std::fmt::Debug for RemotePdpClientImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemotePdpClientImpl")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RemotePdpClient for RemotePdpClientImpl {
    #[tracing::instrument(
        skip_all,
        fields(resource = %request.resource.id, actions = request.actions.len())
    )]
    async fn check_access(
        &self,
        ctx: &CallContext,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationDecisionResponse, PdpClientError> {
        let call = async {
            let Some(limit) = ctx.timeout() else {
                return self.round_trip(request).await;
            };
            tokio::time::timeout(limit, self.round_trip(request))
                .await
                .unwrap_or_else(|_| Err(TransportError::Timeout(limit).into()))
        };

        let result = if let Some(token) = ctx.cancellation() {
            tokio::select! {
                biased;
                () = token.cancelled() => Err(PdpClientError::Cancelled),
                result = call => result,
            }
        } else {
            call.await
        };

        match &result {
            Ok(response) => debug!(decisions = response.value.len(), "check access completed"),
            Err(e) => debug!(error = %e, "check access failed"),
        }
        result
    }
}

fn parse_endpoint(endpoint: &str) -> Result<Uri, ConfigError> {
    let invalid = || ConfigError::InvalidEndpoint {
        endpoint: endpoint.to_owned(),
    };

    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }
    let url = Url::parse(trimmed).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    url.as_str().parse::<Uri>().map_err(|_| invalid())
}

fn decode_response(
    response: Response<Bytes>,
) -> Result<AuthorizationDecisionResponse, PdpClientError> {
    let status = response.status();
    let body = response.into_body();

    if !status.is_success() {
        return Err(PdpClientError::RemoteDecision {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        });
    }

    // A 2xx without content carries no decisions.
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(AuthorizationDecisionResponse::default());
    }

    serde_json::from_slice(&body).map_err(|e| PdpClientError::ResponseDecode(e.to_string()))
}
