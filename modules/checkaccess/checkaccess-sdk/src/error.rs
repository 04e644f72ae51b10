//! Error types for the CheckAccess client.
//!
//! Errors are grouped by the phase that produces them: client construction,
//! request building, and the per-call round trip.

use std::time::Duration;

use thiserror::Error;

/// Client construction errors. Fatal: the configuration has to be fixed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("endpoint: {endpoint} is not valid, need a valid endpoint in creating client")]
    InvalidEndpoint { endpoint: String },

    #[error("scope: {scope} is not valid, need a valid scope in creating client")]
    InvalidScope { scope: String },

    #[error("need TokenCredential in creating client")]
    MissingCredential,
}

/// The identity token could not be decoded into claims.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to extract claims from token: {reason}")]
pub struct ClaimsExtractionError {
    pub reason: String,
}

impl ClaimsExtractionError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors raised while building an [`AuthorizationRequest`](crate::AuthorizationRequest).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RequestBuildError {
    #[error("need token in creating AuthorizationRequest")]
    MissingToken,

    #[error(transparent)]
    ClaimsExtraction(#[from] ClaimsExtractionError),
}

/// Bearer token acquisition failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("credential error: {0}")]
pub struct CredentialError(pub String);

/// Failures below the PDP protocol: network, timeouts, credentials.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport failure: {0}")]
    Other(String),
}

impl TransportError {
    /// Whether a retry may succeed where this attempt failed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Timeout(_) | Self::Other(_))
    }
}

/// Per-call errors from [`RemotePdpClient::check_access`](crate::RemotePdpClient::check_access).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PdpClientError {
    /// The request never got a PDP answer.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The PDP answered with a non-success status.
    #[error("remote PDP returned status {status}: {body}")]
    RemoteDecision { status: u16, body: String },

    /// The PDP answered 2xx but the body is not a decision.
    #[error("failed to decode PDP response: {0}")]
    ResponseDecode(String),

    /// The request could not be encoded.
    #[error("failed to encode authorization request: {0}")]
    RequestEncode(String),

    /// The caller cancelled the call.
    #[error("check access call was cancelled")]
    Cancelled,
}

impl PdpClientError {
    /// HTTP status returned by the PDP, when the failure came from it.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RemoteDecision { status, .. } => Some(*status),
            _ => None,
        }
    }
}
