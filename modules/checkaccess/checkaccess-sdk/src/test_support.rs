use jsonwebtoken::{EncodingKey, Header};
use serde_json::Value;

/// Sign `claims` as an HS256 JWT with a throwaway key.
pub fn sign(claims: &Value) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(b"test-secret-key"),
    )
    .expect("token signs")
}
