use async_trait::async_trait;
use hcp_core::{ContextAttribute, CorrelationContext, EntityRef, Tenant};
use serde_json::Value;

use crate::service::auth::{AuthError, AuthToken};
use crate::service::broker::BrokerError;

/// Issues tenant-scoped bearer tokens.
/// Implementations: Keystone-style Identity Manager over HTTP, fakes in tests.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Obtain a fresh token scoped to `tenant`. Tokens are never cached:
    /// every command pays one call.
    async fn request_token(
        &self,
        ctx: &CorrelationContext,
        tenant: &Tenant,
    ) -> Result<AuthToken, AuthError>;
}

/// NGSI v1 access to the Context Broker holding authoritative entity state.
#[async_trait]
pub trait ContextBroker: Send + Sync {
    /// Query one attribute of one entity. Returns the first attribute value
    /// of the first returned element, or `None` when the response does not
    /// have that shape.
    async fn query_attribute(
        &self,
        ctx: &CorrelationContext,
        tenant: &Tenant,
        token: &AuthToken,
        entity: &EntityRef,
        attribute: &str,
    ) -> Result<Option<Value>, BrokerError>;

    /// Append `attributes` to the entity with an `APPEND` update.
    async fn append_attributes(
        &self,
        ctx: &CorrelationContext,
        tenant: &Tenant,
        token: &AuthToken,
        entity: &EntityRef,
        attributes: Vec<ContextAttribute>,
    ) -> Result<(), BrokerError>;
}
