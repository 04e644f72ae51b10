//! Request pipeline: bearer authentication, telemetry headers and retries
//! around an [`HttpTransport`].

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use checkaccess_sdk::{CredentialError, TokenCredential, TransportError};
use http::header::{AUTHORIZATION, RETRY_AFTER, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Response, StatusCode, Uri};
use rand::Rng;
use secrecy::ExposeSecret;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::RetryConfig;
use crate::transport::HttpTransport;

/// Correlation id sent with every call, constant across its retries.
pub const CLIENT_REQUEST_ID: &str = "x-ms-client-request-id";

const RETRY_AFTER_MS: &str = "retry-after-ms";
const X_MS_RETRY_AFTER_MS: &str = "x-ms-retry-after-ms";

const SDK_USER_AGENT: &str = concat!("checkaccess-rust/", env!("CARGO_PKG_VERSION"));

/// Statuses worth another attempt.
const RETRYABLE_STATUSES: &[StatusCode] = &[
    StatusCode::REQUEST_TIMEOUT,
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

pub struct Pipeline {
    transport: Arc<dyn HttpTransport>,
    credential: Arc<dyn TokenCredential>,
    scope: String,
    retry: RetryConfig,
    try_timeout: Option<Duration>,
    user_agent: HeaderValue,
}

impl Pipeline {
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        credential: Arc<dyn TokenCredential>,
        scope: String,
        retry: RetryConfig,
        try_timeout: Option<Duration>,
        application_id: Option<&str>,
    ) -> Self {
        Self {
            transport,
            credential,
            scope,
            retry,
            try_timeout,
            user_agent: user_agent(application_id),
        }
    }

    /// Stamp telemetry headers, authenticate each attempt and send, retrying
    /// transient failures.
    ///
    /// Returns the last response even when its status is retryable; status
    /// interpretation is the caller's job.
    pub async fn send(
        &self,
        method: &Method,
        uri: &Uri,
        mut headers: HeaderMap,
        body: &Bytes,
    ) -> Result<Response<Bytes>, TransportError> {
        headers.insert(USER_AGENT, self.user_agent.clone());
        let request_id = Uuid::new_v4().to_string();
        headers.insert(
            HeaderName::from_static(CLIENT_REQUEST_ID),
            HeaderValue::from_str(&request_id)
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?,
        );

        let mut attempt: u32 = 0;
        loop {
            let mut request = Request::builder()
                .method(method.clone())
                .uri(uri.clone())
                .body(body.clone())
                .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
            *request.headers_mut() = headers.clone();
            // Fresh token per attempt; caching is the credential's concern.
            request
                .headers_mut()
                .insert(AUTHORIZATION, self.authorization().await?);

            let outcome = self.try_once(request).await;

            // Some(hint) means retryable, hint being the server's Retry-After.
            let retry_hint = match &outcome {
                Ok(response) if RETRYABLE_STATUSES.contains(&response.status()) => {
                    Some(retry_after(response.headers()))
                }
                Err(e) if e.is_transient() => Some(None),
                _ => None,
            };
            let Some(hint) = retry_hint else {
                return outcome;
            };
            if attempt >= self.retry.max_retries {
                debug!(%request_id, attempt, "retries exhausted");
                return outcome;
            }

            let delay = backoff(&self.retry, attempt, hint);
            match &outcome {
                Ok(response) => warn!(
                    %request_id,
                    attempt,
                    status = response.status().as_u16(),
                    delay_ms = delay.as_millis(),
                    "retryable status from PDP, retrying"
                ),
                Err(e) => warn!(
                    %request_id,
                    attempt,
                    error = %e,
                    delay_ms = delay.as_millis(),
                    "transport failure, retrying"
                ),
            }

            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn authorization(&self) -> Result<HeaderValue, TransportError> {
        let token = self.credential.get_token(&[self.scope.as_str()]).await?;
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.token.expose_secret()))
            .map_err(|_| {
                CredentialError("token contains characters not allowed in a header".to_owned())
            })?;
        value.set_sensitive(true);
        Ok(value)
    }

    async fn try_once(&self, request: Request<Bytes>) -> Result<Response<Bytes>, TransportError> {
        let Some(limit) = self.try_timeout else {
            return self.transport.send(request).await;
        };
        tokio::time::timeout(limit, self.transport.send(request))
            .await
            .map_err(|_| TransportError::Timeout(limit))?
    }
}

fn user_agent(application_id: Option<&str>) -> HeaderValue {
    let Some(app) = application_id.map(str::trim).filter(|a| !a.is_empty()) else {
        return HeaderValue::from_static(SDK_USER_AGENT);
    };
    HeaderValue::from_str(&format!("{app} {SDK_USER_AGENT}")).unwrap_or_else(|_| {
        warn!("application id is not a valid header value, leaving it out of User-Agent");
        HeaderValue::from_static(SDK_USER_AGENT)
    })
}

/// Delay before retry number `attempt + 1`.
///
/// A server hint wins over the computed backoff; both are capped at the
/// policy's max delay.
fn backoff(retry: &RetryConfig, attempt: u32, hint: Option<Duration>) -> Duration {
    let max = retry.max_delay();
    if let Some(hint) = hint {
        return hint.min(max);
    }

    let base = retry
        .initial_delay()
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(max);
    let jitter: f64 = rand::rng().random_range(0.8..1.2);
    Duration::try_from_secs_f64(base.as_secs_f64() * jitter)
        .unwrap_or(max)
        .min(max)
}

/// Server-requested delay from `retry-after-ms`, `x-ms-retry-after-ms` or
/// `Retry-After` (seconds or HTTP date).
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    for name in [RETRY_AFTER_MS, X_MS_RETRY_AFTER_MS] {
        if let Some(ms) = header_str(headers, name).and_then(|v| v.parse::<u64>().ok()) {
            return Some(Duration::from_millis(ms));
        }
    }

    let value = header_str(headers, RETRY_AFTER.as_str())?;
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = httpdate::parse_http_date(value).ok()?;
    Some(at.duration_since(SystemTime::now()).unwrap_or_default())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name)?.to_str().ok().map(str::trim)
}
