//! Domain models for the remote CheckAccess PDP.
//!
//! The request side mirrors the wire contract of the remote authority
//! (PascalCase field names). The response side is a typed view over the
//! decision payload that keeps unknown fields intact.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Claim name sent to the PDP when group membership must be resolved
/// out-of-band because the token overflowed its group list.
pub const GROUP_EXPANSION: &str = "GroupExpansion";

/// Claims decoded from an identity token.
///
/// Custom issuer claims and the registered JWT claims live side by side in
/// one flat value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityClaims {
    /// Object id of the subject (`oid`).
    pub subject_id: String,
    /// `true` when `_claim_names` carries a `groups` entry.
    pub group_overflow_indicated: bool,
    /// Groups embedded in the token, in token order.
    pub groups: Vec<String>,
    /// `iss`
    pub issuer: Option<String>,
    /// `sub`
    pub subject: Option<String>,
    /// `aud`, normalized to a list.
    pub audience: Vec<String>,
    /// `exp`
    pub expires_at: Option<OffsetDateTime>,
    /// `iat`
    pub issued_at: Option<OffsetDateTime>,
    /// `jti`
    pub token_id: Option<String>,
}

/// Authorization request sent to the PDP.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Who is asking.
    #[serde(rename = "Subject")]
    pub subject: SubjectInfo,
    /// Requested actions, in caller order.
    #[serde(rename = "Actions")]
    pub actions: Vec<ActionInfo>,
    /// Target resource.
    #[serde(rename = "Resource")]
    pub resource: ResourceInfo,
}

/// Subject section of an [`AuthorizationRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectInfo {
    #[serde(rename = "Attributes")]
    pub attributes: SubjectAttributes,
}

/// Subject attributes evaluated by the PDP.
///
/// `claim_name` and `groups` are mutually exclusive; the request builder
/// never sets both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectAttributes {
    #[serde(rename = "ObjectId")]
    pub object_id: String,
    /// Set to [`GROUP_EXPANSION`] when the PDP has to fetch memberships itself.
    #[serde(
        rename = "xms-pasrp-retrievegroupmemberships",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub claim_name: Option<String>,
    #[serde(rename = "Groups", default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
}

impl SubjectAttributes {
    /// Attributes for a subject with no group information.
    #[must_use]
    pub fn new(object_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            claim_name: None,
            groups: None,
        }
    }
}

/// A single requested action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionInfo {
    #[serde(rename = "Id")]
    pub id: String,
}

/// The resource being accessed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    #[serde(rename = "Id")]
    pub id: String,
}

/// Access decision for one action.
///
/// Values this client does not know are kept verbatim in `Other` and
/// serialized back as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccessDecision {
    Allowed,
    NotAllowed,
    Denied,
    Other(String),
}

impl Default for AccessDecision {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl AccessDecision {
    /// Wire value of the decision.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Allowed => "Allowed",
            Self::NotAllowed => "NotAllowed",
            Self::Denied => "Denied",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for AccessDecision {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "Allowed" => Self::Allowed,
            "NotAllowed" => Self::NotAllowed,
            "Denied" => Self::Denied,
            _ => Self::Other(raw),
        }
    }
}

impl From<AccessDecision> for String {
    fn from(decision: AccessDecision) -> Self {
        match decision {
            AccessDecision::Other(raw) => raw,
            known => known.as_str().to_owned(),
        }
    }
}

/// Decision for a single action as returned by the PDP.
///
/// Missing fields decode to their zero values; fields this client does not
/// model are kept in `additional`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationDecision {
    #[serde(default)]
    pub action_id: String,
    #[serde(default)]
    pub access_decision: AccessDecision,
    #[serde(default)]
    pub is_data_action: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_assignment: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny_assignment: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_live_in_ms: Option<u64>,
    #[serde(flatten)]
    pub additional: serde_json::Map<String, serde_json::Value>,
}

/// Successful PDP response.
///
/// Passed through as received: fields this client does not model are kept
/// in `additional` and serialized back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationDecisionResponse {
    #[serde(default)]
    pub value: Vec<AuthorizationDecision>,
    #[serde(flatten)]
    pub additional: serde_json::Map<String, serde_json::Value>,
}

impl AuthorizationDecisionResponse {
    /// First decision recorded for `action_id`, if any.
    #[must_use]
    pub fn decision_for(&self, action_id: &str) -> Option<&AuthorizationDecision> {
        self.value.iter().find(|d| d.action_id == action_id)
    }
}
