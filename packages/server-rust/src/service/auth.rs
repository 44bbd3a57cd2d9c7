//! Keystone-style Identity Manager client.
//!
//! Every command requests a fresh tenant-scoped token with a password grant:
//! the user lives in the tenant service's domain and the scope is the project
//! named after the service path.

use std::fmt;

use async_trait::async_trait;
use hcp_core::{CorrelationContext, Tenant};
use serde::Serialize;
use tracing::debug;

use super::config::IdentityConfig;
use crate::traits::IdentityProvider;

/// Response header carrying the issued token.
pub const SUBJECT_TOKEN_HEADER: &str = "x-subject-token";

const TOKENS_PATH: &str = "/v3/auth/tokens";

// ---------------------------------------------------------------------------
// Token and errors
// ---------------------------------------------------------------------------

/// Opaque bearer token. Its value never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("identity manager unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("identity manager answered HTTP {status}")]
    Status { status: reqwest::StatusCode },

    #[error("identity manager response carries no x-subject-token header")]
    MissingToken,
}

// ---------------------------------------------------------------------------
// Request body
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct TokenRequest<'a> {
    auth: AuthBody<'a>,
}

#[derive(Serialize)]
struct AuthBody<'a> {
    identity: Identity<'a>,
    scope: Scope<'a>,
}

#[derive(Serialize)]
struct Identity<'a> {
    methods: [&'static str; 1],
    password: PasswordMethod<'a>,
}

#[derive(Serialize)]
struct PasswordMethod<'a> {
    user: User<'a>,
}

#[derive(Serialize)]
struct User<'a> {
    domain: Named<'a>,
    name: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct Scope<'a> {
    project: Project<'a>,
}

#[derive(Serialize)]
struct Project<'a> {
    domain: Named<'a>,
    name: &'a str,
}

#[derive(Serialize)]
struct Named<'a> {
    name: &'a str,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// HTTP [`IdentityProvider`] speaking the Keystone v3 token API.
pub struct KeystoneClient {
    http: reqwest::Client,
    tokens_url: String,
    user: String,
    password: String,
    project_domain: Option<String>,
}

impl KeystoneClient {
    #[must_use]
    pub fn new(http: reqwest::Client, config: &IdentityConfig) -> Self {
        Self {
            http,
            tokens_url: format!("{}{TOKENS_PATH}", config.endpoint.base_url()),
            user: config.user.clone(),
            password: config.password.clone(),
            project_domain: config.project_domain.clone(),
        }
    }

    fn token_request<'a>(&'a self, tenant: &'a Tenant) -> TokenRequest<'a> {
        let project_domain = self.project_domain.as_deref().unwrap_or(&tenant.service);
        TokenRequest {
            auth: AuthBody {
                identity: Identity {
                    methods: ["password"],
                    password: PasswordMethod {
                        user: User {
                            domain: Named {
                                name: &tenant.service,
                            },
                            name: &self.user,
                            password: &self.password,
                        },
                    },
                },
                scope: Scope {
                    project: Project {
                        domain: Named {
                            name: project_domain,
                        },
                        name: &tenant.service_path,
                    },
                },
            },
        }
    }
}

#[async_trait]
impl IdentityProvider for KeystoneClient {
    async fn request_token(
        &self,
        ctx: &CorrelationContext,
        tenant: &Tenant,
    ) -> Result<AuthToken, AuthError> {
        debug!(url = %self.tokens_url, tenant = %tenant, corr = %ctx.correlator, "requesting token");

        let response = self
            .http
            .post(&self.tokens_url)
            .json(&self.token_request(tenant))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Status { status });
        }

        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .ok_or(AuthError::MissingToken)?;

        debug!(status = %status, "token issued");
        Ok(AuthToken::new(token))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::service::config::Endpoint;

    fn ctx() -> CorrelationContext {
        CorrelationContext::for_request(
            Some("corr-1".to_string()),
            "trans-1".to_string(),
            "POST",
            Some(tenant()),
            None,
        )
    }

    fn tenant() -> Tenant {
        Tenant::new("acme", "/plant")
    }

    fn client_for(server: &MockServer, project_domain: Option<&str>) -> KeystoneClient {
        let uri = reqwest::Url::parse(&server.uri()).unwrap();
        let config = IdentityConfig {
            endpoint: Endpoint::new("http", uri.host_str().unwrap(), uri.port().unwrap()),
            user: "hcp".to_string(),
            password: "secret".to_string(),
            project_domain: project_domain.map(str::to_string),
        };
        KeystoneClient::new(reqwest::Client::new(), &config)
    }

    #[tokio::test]
    async fn sends_password_grant_scoped_to_tenant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .and(body_json(json!({
                "auth": {
                    "identity": {
                        "methods": ["password"],
                        "password": {
                            "user": {
                                "domain": {"name": "acme"},
                                "name": "hcp",
                                "password": "secret"
                            }
                        }
                    },
                    "scope": {
                        "project": {
                            "domain": {"name": "acme"},
                            "name": "/plant"
                        }
                    }
                }
            })))
            .respond_with(ResponseTemplate::new(201).insert_header(SUBJECT_TOKEN_HEADER, "tok-1"))
            .expect(1)
            .mount(&server)
            .await;

        let token = client_for(&server, None)
            .request_token(&ctx(), &tenant())
            .await
            .unwrap();
        assert_eq!(token.as_str(), "tok-1");
    }

    #[tokio::test]
    async fn configured_project_domain_overrides_service() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(ResponseTemplate::new(201).insert_header(SUBJECT_TOKEN_HEADER, "tok-2"))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("urbo"));
        let body = serde_json::to_value(client.token_request(&tenant())).unwrap();
        assert_eq!(body["auth"]["scope"]["project"]["domain"]["name"], "urbo");
        assert_eq!(body["auth"]["identity"]["password"]["user"]["domain"]["name"], "acme");
    }

    #[tokio::test]
    async fn missing_header_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .request_token(&ctx(), &tenant())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
    }

    #[tokio::test]
    async fn rejected_credentials_are_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).insert_header(SUBJECT_TOKEN_HEADER, "ignored"))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .request_token(&ctx(), &tenant())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AuthError::Status { status } if status == reqwest::StatusCode::UNAUTHORIZED
        ));
    }

    #[tokio::test]
    async fn unreachable_identity_manager_is_transport_error() {
        let config = IdentityConfig {
            endpoint: Endpoint::new("http", "127.0.0.1", 1),
            ..IdentityConfig::default()
        };
        let client = KeystoneClient::new(reqwest::Client::new(), &config);
        let err = client.request_token(&ctx(), &tenant()).await.unwrap_err();
        assert!(matches!(err, AuthError::Transport(_)));
    }

    #[test]
    fn token_debug_is_redacted() {
        assert_eq!(format!("{:?}", AuthToken::new("abc")), "AuthToken(***)");
    }
}
