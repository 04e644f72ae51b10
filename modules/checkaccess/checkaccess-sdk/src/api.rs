//! Public API trait for the remote PDP client.

use async_trait::async_trait;

use crate::context::CallContext;
use crate::error::PdpClientError;
use crate::models::{AuthorizationDecisionResponse, AuthorizationRequest};

/// Client for the remote CheckAccess PDP.
///
/// Consumers hold an `Arc<dyn RemotePdpClient>` and build requests with
/// [`AuthorizationRequestBuilder`](crate::AuthorizationRequestBuilder):
///
/// ```ignore
/// let request = create_authorization_request(&resource_id, ["read"], &user_token)?;
/// let response = pdp.check_access(&CallContext::new(), &request).await?;
/// ```
#[async_trait]
pub trait RemotePdpClient: Send + Sync {
    /// Ask the PDP for a decision on `request`.
    ///
    /// Every call is a fresh round trip; nothing is cached.
    ///
    /// # Errors
    ///
    /// - `Transport` when no answer was received (network, timeout, credential)
    /// - `RemoteDecision` when the PDP answered with a non-success status
    /// - `ResponseDecode` when a success body is not a decision
    /// - `Cancelled` when the context's cancellation token fired
    async fn check_access(
        &self,
        ctx: &CallContext,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationDecisionResponse, PdpClientError>;
}
