//! Bearer token acquisition capability.

use async_trait::async_trait;
use secrecy::SecretString;
use time::OffsetDateTime;

use crate::error::CredentialError;

/// A bearer token issued for a set of scopes.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Raw token value. Redacted in `Debug`.
    pub token: SecretString,
    /// Expiry reported by the issuer, if known.
    pub expires_on: Option<OffsetDateTime>,
}

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<SecretString>) -> Self {
        Self {
            token: token.into(),
            expires_on: None,
        }
    }

    #[must_use]
    pub fn with_expiry(mut self, expires_on: OffsetDateTime) -> Self {
        self.expires_on = Some(expires_on);
        self
    }
}

/// Produces bearer tokens for the PDP.
///
/// Implementations own refresh and caching; the client asks for a token once
/// per `check_access` attempt.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    /// Get a token valid for `scopes`.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when no token can be obtained.
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken, CredentialError>;
}
