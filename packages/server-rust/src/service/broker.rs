//! NGSI v1 Context Broker client.
//!
//! The broker answers with HTTP 200 for protocol-level failures too, so the
//! outcome of every call is decided by the first embedded status code. A
//! reply without one (including an empty or non-JSON body) is accepted.

use async_trait::async_trait;
use hcp_core::context::{CORRELATOR_HEADER, SERVICE_HEADER, SERVICE_PATH_HEADER};
use hcp_core::{
    ContextAttribute, ContextResponseEnvelope, CorrelationContext, EntityRef, QueryContextRequest,
    StatusCode, Tenant, UpdateContextRequest,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::auth::AuthToken;
use super::config::Endpoint;
use crate::traits::ContextBroker;

pub const QUERY_CONTEXT_PATH: &str = "/v1/queryContext";
pub const UPDATE_CONTEXT_PATH: &str = "/v1/updateContext";

pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("context broker unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("context broker rejected the request: {0}")]
    Rejected(StatusCode),
}

/// Fails only when an embedded status code is present and does not begin
/// with `'2'`.
fn check_status(envelope: &ContextResponseEnvelope) -> Result<(), BrokerError> {
    match envelope.first_status() {
        Some(status) if !status.is_success() => Err(BrokerError::Rejected(status.clone())),
        _ => Ok(()),
    }
}

/// Empty or undecodable bodies read as an envelope with nothing in it.
fn decode_envelope(http_status: reqwest::StatusCode, bytes: &[u8]) -> ContextResponseEnvelope {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return ContextResponseEnvelope::default();
    }
    serde_json::from_slice(bytes).unwrap_or_else(|err| {
        warn!(http_status = %http_status, error = %err, "context broker body is not an NGSI response");
        ContextResponseEnvelope::default()
    })
}

/// HTTP [`ContextBroker`].
pub struct ContextBrokerClient {
    http: reqwest::Client,
    base_url: String,
}

impl ContextBrokerClient {
    #[must_use]
    pub fn new(http: reqwest::Client, endpoint: &Endpoint) -> Self {
        Self {
            http,
            base_url: endpoint.base_url(),
        }
    }

    async fn post<B: Serialize + Sync>(
        &self,
        ctx: &CorrelationContext,
        tenant: &Tenant,
        token: &AuthToken,
        path: &str,
        body: &B,
    ) -> Result<ContextResponseEnvelope, BrokerError> {
        let url = format!("{}{path}", self.base_url);
        debug!(
            url = %url,
            request = %serde_json::to_string(body).unwrap_or_default(),
            "context broker request"
        );

        let response = self
            .http
            .post(&url)
            .header(SERVICE_HEADER, &tenant.service)
            .header(SERVICE_PATH_HEADER, &tenant.service_path)
            .header(CORRELATOR_HEADER, &ctx.correlator)
            .header(AUTH_TOKEN_HEADER, token.as_str())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        let http_status = response.status();
        let bytes = response.bytes().await?;
        debug!(
            url = %url,
            http_status = %http_status,
            response = %String::from_utf8_lossy(&bytes),
            "context broker response"
        );

        Ok(decode_envelope(http_status, &bytes))
    }
}

#[async_trait]
impl ContextBroker for ContextBrokerClient {
    async fn query_attribute(
        &self,
        ctx: &CorrelationContext,
        tenant: &Tenant,
        token: &AuthToken,
        entity: &EntityRef,
        attribute: &str,
    ) -> Result<Option<Value>, BrokerError> {
        let request = QueryContextRequest::single(entity, attribute);
        let envelope = self
            .post(ctx, tenant, token, QUERY_CONTEXT_PATH, &request)
            .await?;
        check_status(&envelope)?;
        Ok(envelope.first_attribute_value().cloned())
    }

    async fn append_attributes(
        &self,
        ctx: &CorrelationContext,
        tenant: &Tenant,
        token: &AuthToken,
        entity: &EntityRef,
        attributes: Vec<ContextAttribute>,
    ) -> Result<(), BrokerError> {
        let request = UpdateContextRequest::append(entity, attributes);
        let envelope = self
            .post(ctx, tenant, token, UPDATE_CONTEXT_PATH, &request)
            .await?;
        check_status(&envelope)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn tenant() -> Tenant {
        Tenant::new("acme", "/plant")
    }

    fn ctx() -> CorrelationContext {
        CorrelationContext::for_request(
            Some("corr-7".to_string()),
            "trans-7".to_string(),
            "POST",
            Some(tenant()),
            None,
        )
    }

    fn entity() -> EntityRef {
        EntityRef::new("pump-1", "Pump")
    }

    fn client_for(server: &MockServer) -> ContextBrokerClient {
        let uri = reqwest::Url::parse(&server.uri()).unwrap();
        let endpoint = Endpoint::new("http", uri.host_str().unwrap(), uri.port().unwrap());
        ContextBrokerClient::new(reqwest::Client::new(), &endpoint)
    }

    fn query_reply(code: &str, value: Value) -> Value {
        json!({
            "contextResponses": [{
                "contextElement": {
                    "attributes": [{"name": "powerStateGeneral", "type": "Number", "value": value}],
                    "id": "pump-1",
                    "isPattern": "false",
                    "type": "Pump"
                },
                "statusCode": {"code": code, "reasonPhrase": "OK"}
            }]
        })
    }

    #[tokio::test]
    async fn query_sends_tenant_headers_and_returns_value() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(QUERY_CONTEXT_PATH))
            .and(header(SERVICE_HEADER, "acme"))
            .and(header(SERVICE_PATH_HEADER, "/plant"))
            .and(header(CORRELATOR_HEADER, "corr-7"))
            .and(header("x-auth-token", "tok"))
            .and(header("accept", "application/json"))
            .and(body_json(json!({
                "entities": [{"id": "pump-1", "isPattern": "false", "type": "Pump"}],
                "attributes": ["powerStateGeneral"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(query_reply("200", json!("1"))))
            .expect(1)
            .mount(&server)
            .await;

        let value = client_for(&server)
            .query_attribute(&ctx(), &tenant(), &AuthToken::new("tok"), &entity(), "powerStateGeneral")
            .await
            .unwrap();
        assert_eq!(value, Some(json!("1")));
    }

    #[tokio::test]
    async fn query_without_elements_yields_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(QUERY_CONTEXT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contextResponses": [{"statusCode": {"code": "200", "reasonPhrase": "OK"}}]
            })))
            .mount(&server)
            .await;

        let value = client_for(&server)
            .query_attribute(&ctx(), &tenant(), &AuthToken::new("tok"), &entity(), "powerStateGeneral")
            .await
            .unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn query_error_code_is_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(QUERY_CONTEXT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errorCode": {"code": "404", "reasonPhrase": "No context element found"}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .query_attribute(&ctx(), &tenant(), &AuthToken::new("tok"), &entity(), "powerStateGeneral")
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Rejected(ref status) if status.code == "404"));
    }

    #[tokio::test]
    async fn append_sends_append_action() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPDATE_CONTEXT_PATH))
            .and(body_json(json!({
                "contextElements": [{
                    "type": "Pump",
                    "isPattern": "false",
                    "id": "pump-1",
                    "attributes": [{"name": "safetyInterlockStatus", "type": "Text", "value": "OK"}]
                }],
                "updateAction": "APPEND"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contextResponses": [{"statusCode": {"code": 200, "reasonPhrase": "OK"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .append_attributes(
                &ctx(),
                &tenant(),
                &AuthToken::new("tok"),
                &entity(),
                vec![ContextAttribute::new("safetyInterlockStatus", "Text", "OK")],
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn append_non_success_status_is_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contextResponses": [{"statusCode": {"code": "472", "reasonPhrase": "request parameter is invalid/not allowed"}}]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .append_attributes(&ctx(), &tenant(), &AuthToken::new("tok"), &entity(), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Rejected(_)));
    }

    #[tokio::test]
    async fn query_without_status_still_reads_value() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(QUERY_CONTEXT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contextResponses": [{
                    "contextElement": {
                        "attributes": [{"name": "powerStateGeneral", "type": "Number", "value": "1"}],
                        "id": "pump-1",
                        "isPattern": "false",
                        "type": "Pump"
                    }
                }]
            })))
            .mount(&server)
            .await;

        let value = client_for(&server)
            .query_attribute(&ctx(), &tenant(), &AuthToken::new("tok"), &entity(), "powerStateGeneral")
            .await
            .unwrap();
        assert_eq!(value, Some(json!("1")));
    }

    #[tokio::test]
    async fn append_with_empty_body_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(UPDATE_CONTEXT_PATH))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server)
            .append_attributes(&ctx(), &tenant(), &AuthToken::new("tok"), &entity(), Vec::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn non_json_query_body_reads_as_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let value = client_for(&server)
            .query_attribute(&ctx(), &tenant(), &AuthToken::new("tok"), &entity(), "powerStateGeneral")
            .await
            .unwrap();
        assert_eq!(value, None);
    }
}
