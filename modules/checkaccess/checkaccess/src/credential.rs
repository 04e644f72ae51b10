use async_trait::async_trait;
use checkaccess_sdk::{AccessToken, CredentialError, TokenCredential};
use secrecy::{ExposeSecret, SecretString};

/// Credential returning one pre-acquired bearer token for every scope.
///
/// Meant for operators and tests; refreshing is left to whoever supplied the token.
#[derive(Clone)]
pub struct StaticTokenCredential {
    token: SecretString,
}

impl StaticTokenCredential {
    #[must_use]
    pub fn new(token: impl Into<SecretString>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticTokenCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenCredential")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self, _scopes: &[&str]) -> Result<AccessToken, CredentialError> {
        let token = self.token.expose_secret();
        if token.trim().is_empty() {
            return Err(CredentialError("static bearer token is empty".to_owned()));
        }
        Ok(AccessToken::new(token))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_configured_token() {
        let cred = StaticTokenCredential::new("abc");
        let token = cred.get_token(&["scope"]).await.unwrap();
        assert_eq!(token.token.expose_secret(), "abc");
        assert!(token.expires_on.is_none());
    }

    #[tokio::test]
    async fn blank_token_is_an_error() {
        let cred = StaticTokenCredential::new("  ");
        assert!(cred.get_token(&["scope"]).await.is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let dbg = format!("{:?}", StaticTokenCredential::new("super-secret"));
        assert!(!dbg.contains("super-secret"));
    }
}
