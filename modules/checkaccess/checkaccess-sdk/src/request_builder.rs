//! Authorization request construction.
//!
//! [`AuthorizationRequestBuilder`] turns `(resource id, actions, identity token)`
//! into an [`AuthorizationRequest`]. The only branching logic is the
//! group-overflow policy in [`GroupMembership::resolve`], which decides how the
//! subject's group membership is represented on the wire.

use std::sync::Arc;

use crate::claims::{ClaimsDecoder, UnverifiedJwtDecoder};
use crate::error::RequestBuildError;
use crate::models::{
    ActionInfo, AuthorizationRequest, GROUP_EXPANSION, IdentityClaims, ResourceInfo,
    SubjectAttributes, SubjectInfo,
};

/// How group membership is sent to the PDP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupMembership {
    /// Overflow signalled but groups also embedded. Both are dropped.
    Conflicting,
    /// Overflow signalled, no embedded groups: the PDP expands memberships.
    Expand,
    /// Groups embedded verbatim.
    Inline(Vec<String>),
    /// No group information at all.
    Absent,
}

impl GroupMembership {
    /// Apply the group-overflow policy to decoded token data.
    #[must_use]
    pub fn resolve(group_overflow_indicated: bool, groups: &[String]) -> Self {
        match (group_overflow_indicated, groups.is_empty()) {
            (true, false) => Self::Conflicting,
            (true, true) => Self::Expand,
            (false, false) => Self::Inline(groups.to_vec()),
            (false, true) => Self::Absent,
        }
    }

    /// Wire representation as `(claim_name, groups)`. Never both `Some`.
    #[must_use]
    pub fn into_attributes(self) -> (Option<String>, Option<Vec<String>>) {
        match self {
            Self::Expand => (Some(GROUP_EXPANSION.to_owned()), None),
            Self::Inline(groups) => (None, Some(groups)),
            Self::Conflicting | Self::Absent => (None, None),
        }
    }
}

/// Builds [`AuthorizationRequest`]s from identity tokens.
///
/// Holds the claims decoder; cheap to clone and free of per-call state, so the
/// same inputs always produce equal requests.
///
/// ```ignore
/// let builder = AuthorizationRequestBuilder::new();
/// let request = builder.build("resource456", ["read", "write"], &user_token)?;
/// let decision = pdp.check_access(&CallContext::new(), &request).await?;
/// ```
#[derive(Clone)]
pub struct AuthorizationRequestBuilder {
    decoder: Arc<dyn ClaimsDecoder>,
}

impl Default for AuthorizationRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthorizationRequestBuilder {
    /// Builder using the [`UnverifiedJwtDecoder`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_decoder(Arc::new(UnverifiedJwtDecoder))
    }

    /// Builder using a caller-supplied decoder (e.g. one that verifies signatures).
    #[must_use]
    pub fn with_decoder(decoder: Arc<dyn ClaimsDecoder>) -> Self {
        Self { decoder }
    }

    /// Decode `token` and build the request for `resource_id` and `actions`.
    ///
    /// # Errors
    ///
    /// - [`RequestBuildError::MissingToken`] if `token` is blank
    /// - [`RequestBuildError::ClaimsExtraction`] if the token cannot be decoded
    pub fn build<I, S>(
        &self,
        resource_id: &str,
        actions: I,
        token: &str,
    ) -> Result<AuthorizationRequest, RequestBuildError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if token.trim().is_empty() {
            return Err(RequestBuildError::MissingToken);
        }

        let claims = self.decoder.decode(token)?;
        Ok(build_for_subject(
            resource_id,
            actions,
            subject_attributes(&claims),
        ))
    }
}

impl std::fmt::Debug for AuthorizationRequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationRequestBuilder")
            .finish_non_exhaustive()
    }
}

/// Subject attributes for decoded claims, with the group-overflow policy applied.
#[must_use]
pub fn subject_attributes(claims: &IdentityClaims) -> SubjectAttributes {
    let membership = GroupMembership::resolve(claims.group_overflow_indicated, &claims.groups);
    if membership == GroupMembership::Conflicting {
        tracing::warn!(
            object_id = %claims.subject_id,
            group_count = claims.groups.len(),
            "token signals group overflow but also embeds groups; sending no group data"
        );
    }

    let (claim_name, groups) = membership.into_attributes();
    SubjectAttributes {
        object_id: claims.subject_id.clone(),
        claim_name,
        groups,
    }
}

/// Build a request from `token` with the default decoder.
///
/// # Errors
///
/// See [`AuthorizationRequestBuilder::build`].
pub fn create_authorization_request<I, S>(
    resource_id: &str,
    actions: I,
    token: &str,
) -> Result<AuthorizationRequest, RequestBuildError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    AuthorizationRequestBuilder::new().build(resource_id, actions, token)
}

/// Build a request for subject attributes that were obtained elsewhere.
///
/// No extraction happens; `resource_id` and `actions` are mapped as-is.
#[must_use]
pub fn build_for_subject<I, S>(
    resource_id: &str,
    actions: I,
    attributes: SubjectAttributes,
) -> AuthorizationRequest
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    AuthorizationRequest {
        subject: SubjectInfo { attributes },
        actions: actions
            .into_iter()
            .map(|id| ActionInfo { id: id.into() })
            .collect(),
        resource: ResourceInfo {
            id: resource_id.to_owned(),
        },
    }
}
