#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! CheckAccess SDK
//!
//! Public surface of the remote PDP client:
//!
//! - [`RemotePdpClient`] - API trait for consumers
//! - [`AuthorizationRequest`], [`AuthorizationDecisionResponse`] - wire models
//! - [`AuthorizationRequestBuilder`] - builds requests from identity tokens
//! - [`ClaimsDecoder`], [`extract_claims`] - identity token decoding
//! - [`TokenCredential`] - bearer token capability consumed by the client
//! - [`CallContext`] - per-call timeout and cancellation
//!
//! ## Usage
//!
//! ```ignore
//! use checkaccess_sdk::{CallContext, RemotePdpClient, create_authorization_request};
//!
//! let request = create_authorization_request("resource456", ["read", "write"], &user_token)?;
//! let response = pdp.check_access(&CallContext::new(), &request).await?;
//!
//! for decision in &response.value {
//!     println!("{} -> {:?}", decision.action_id, decision.access_decision);
//! }
//! ```

pub mod api;
pub mod claims;
pub mod context;
pub mod credential;
pub mod error;
pub mod models;
pub mod request_builder;

#[cfg(test)]
mod test_support;

pub use api::RemotePdpClient;
pub use claims::{ClaimsDecoder, UnverifiedJwtDecoder, extract_claims};
pub use context::CallContext;
pub use credential::{AccessToken, TokenCredential};
pub use error::{
    ClaimsExtractionError, ConfigError, CredentialError, PdpClientError, RequestBuildError,
    TransportError,
};
pub use models::{
    AccessDecision, ActionInfo, AuthorizationDecision, AuthorizationDecisionResponse,
    AuthorizationRequest, GROUP_EXPANSION, IdentityClaims, ResourceInfo, SubjectAttributes,
    SubjectInfo,
};
pub use request_builder::{
    AuthorizationRequestBuilder, GroupMembership, build_for_subject, create_authorization_request,
    subject_attributes,
};
