//! Identity token claims extraction.
//!
//! - [`ClaimsDecoder`] - capability turning a token string into [`IdentityClaims`]
//! - [`UnverifiedJwtDecoder`] - default decoder, parses a JWT without checking its signature
//! - [`extract_claims`] - shorthand using the default decoder

use std::collections::HashMap;

use serde::Deserialize;
use time::{Duration, OffsetDateTime};

use crate::error::ClaimsExtractionError;
use crate::models::IdentityClaims;

/// Key under `_claim_names` that signals group overflow.
const GROUPS_CLAIM: &str = "groups";

/// Decodes an identity token into claims.
pub trait ClaimsDecoder: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ClaimsExtractionError`] if the token is malformed or cannot be decoded.
    fn decode(&self, token: &str) -> Result<IdentityClaims, ClaimsExtractionError>;
}

/// Parses a JWT without verifying the signature or temporal claims.
///
/// Trust decisions stay with the PDP, which receives the resulting subject
/// attributes; this decoder only reads what the token asserts.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnverifiedJwtDecoder;

impl ClaimsDecoder for UnverifiedJwtDecoder {
    fn decode(&self, token: &str) -> Result<IdentityClaims, ClaimsExtractionError> {
        let data = jsonwebtoken::dangerous::insecure_decode::<RawClaims>(token)
            .map_err(|e| ClaimsExtractionError::new(e.to_string()))?;
        tracing::trace!(alg = ?data.header.alg, "decoded identity token");

        data.claims.into_identity()
    }
}

/// Extract claims from `token` with the [`UnverifiedJwtDecoder`].
///
/// # Errors
///
/// Returns [`ClaimsExtractionError`] if the token is not a decodable JWT.
pub fn extract_claims(token: &str) -> Result<IdentityClaims, ClaimsExtractionError> {
    UnverifiedJwtDecoder.decode(token)
}

/// `aud` is either a single string or an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Audience {
    One(String),
    Many(Vec<String>),
}

/// Payload as issued. Every claim is optional and `null` reads as absent.
#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    oid: Option<String>,
    #[serde(default, rename = "_claim_names")]
    claim_names: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    groups: Option<Vec<String>>,
    #[serde(default)]
    iss: Option<String>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    aud: Option<Audience>,
    /// NumericDate, possibly fractional.
    #[serde(default)]
    exp: Option<f64>,
    #[serde(default)]
    iat: Option<f64>,
    #[serde(default)]
    jti: Option<String>,
}

impl RawClaims {
    fn into_identity(self) -> Result<IdentityClaims, ClaimsExtractionError> {
        let audience = match self.aud {
            Some(Audience::One(aud)) => vec![aud],
            Some(Audience::Many(aud)) => aud,
            None => Vec::new(),
        };

        Ok(IdentityClaims {
            subject_id: self.oid.unwrap_or_default(),
            group_overflow_indicated: self
                .claim_names
                .is_some_and(|names| names.contains_key(GROUPS_CLAIM)),
            groups: self.groups.unwrap_or_default(),
            issuer: self.iss,
            subject: self.sub,
            audience,
            expires_at: timestamp("exp", self.exp)?,
            issued_at: timestamp("iat", self.iat)?,
            token_id: self.jti,
        })
    }
}

/// NumericDate to a timestamp, truncated to whole seconds.
fn timestamp(
    claim: &str,
    value: Option<f64>,
) -> Result<Option<OffsetDateTime>, ClaimsExtractionError> {
    value
        .map(|secs| {
            Duration::checked_seconds_f64(secs.trunc())
                .and_then(|offset| OffsetDateTime::UNIX_EPOCH.checked_add(offset))
                .ok_or_else(|| {
                    ClaimsExtractionError::new(format!("`{claim}` claim out of range: {secs}"))
                })
        })
        .transpose()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::sign;

    #[test]
    fn extracts_custom_and_registered_claims() {
        let token = sign(&json!({
            "oid": "1234567890",
            "_claim_names": { "example_claim": "example_value" },
            "groups": ["g1", "g2"],
            "iss": "test-issuer",
            "sub": "test-subject",
            "aud": ["test-audience"],
            "exp": 1_900_000_000,
            "iat": 1_700_000_000,
            "jti": "unique-id"
        }));

        let claims = extract_claims(&token).unwrap();

        assert_eq!(claims.subject_id, "1234567890");
        assert!(!claims.group_overflow_indicated);
        assert_eq!(claims.groups, vec!["g1", "g2"]);
        assert_eq!(claims.issuer.as_deref(), Some("test-issuer"));
        assert_eq!(claims.subject.as_deref(), Some("test-subject"));
        assert_eq!(claims.audience, vec!["test-audience"]);
        assert_eq!(
            claims.expires_at.map(OffsetDateTime::unix_timestamp),
            Some(1_900_000_000)
        );
        assert_eq!(
            claims.issued_at.map(OffsetDateTime::unix_timestamp),
            Some(1_700_000_000)
        );
        assert_eq!(claims.token_id.as_deref(), Some("unique-id"));
    }

    #[test]
    fn groups_entry_in_claim_names_signals_overflow() {
        let token = sign(&json!({
            "oid": "oid",
            "_claim_names": { "groups": "src1" }
        }));

        let claims = extract_claims(&token).unwrap();
        assert!(claims.group_overflow_indicated);
        assert!(claims.groups.is_empty());
    }

    #[test]
    fn expired_token_still_decodes() {
        let token = sign(&json!({ "oid": "oid", "exp": 1 }));
        assert!(extract_claims(&token).is_ok());
    }

    #[test]
    fn single_string_audience_is_normalized() {
        let token = sign(&json!({ "oid": "oid", "aud": "api://pdp" }));
        let claims = extract_claims(&token).unwrap();
        assert_eq!(claims.audience, vec!["api://pdp"]);
    }

    #[test]
    fn missing_claims_decode_to_empty_values() {
        let token = sign(&json!({}));
        let claims = extract_claims(&token).unwrap();
        assert_eq!(claims, IdentityClaims::default());
    }

    #[test]
    fn fractional_numeric_dates_are_truncated() {
        let token = sign(&json!({ "oid": "o", "exp": 1_900_000_000.5, "iat": 1_700_000_000.999 }));

        let claims = extract_claims(&token).unwrap();

        assert_eq!(
            claims.expires_at.map(OffsetDateTime::unix_timestamp),
            Some(1_900_000_000)
        );
        assert_eq!(
            claims.issued_at.map(OffsetDateTime::unix_timestamp),
            Some(1_700_000_000)
        );
    }

    #[test]
    fn null_claims_read_as_absent() {
        let token = sign(&json!({
            "oid": null,
            "groups": null,
            "_claim_names": null,
            "aud": null,
            "exp": null
        }));

        let claims = extract_claims(&token).unwrap();
        assert_eq!(claims, IdentityClaims::default());
    }

    #[test]
    fn rejects_non_tokens() {
        for token in ["invalid", "", "a.b.c", "not a jwt at all"] {
            assert!(extract_claims(token).is_err(), "accepted {token:?}");
        }
    }
}
