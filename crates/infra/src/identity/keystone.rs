//! Keystone v3 password authentication
//!
//! Tokens are obtained with a project-scoped password exchange against
//! `POST /v3/auth/tokens`. The token itself comes back in the
//! `X-Subject-Token` header; the body carries its expiry, the project and the
//! service catalog.
//!
//! Exchanges are serialized by an async mutex held across the network call.
//! Readers go through a separate lock and never wait on the network.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use osc_domain::constants::{REAUTH_COOLDOWN, SUBJECT_TOKEN_HEADER};
use osc_domain::{AuthOptions, AuthRequest, Credential, EndpointCatalog, OpenStackError, Result, TokenResponse};
use parking_lot::RwLock;
use reqwest::Method;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::CredentialProvider;
use crate::errors::InfraError;
use crate::http::{HttpSender, RequestContext, TokenSource};

#[derive(Debug, Default)]
struct Session {
    credential: Credential,
    catalog: EndpointCatalog,
}

/// Keystone credential provider.
pub struct Keystone {
    options: AuthOptions,
    sender: Arc<dyn HttpSender>,
    session: RwLock<Session>,
    /// Serializes exchanges; holds the time of the last successful refresh.
    last_refresh: Mutex<Option<Instant>>,
    cooldown: Duration,
}

impl std::fmt::Debug for Keystone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keystone")
            .field("options", &self.options)
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}

impl Keystone {
    /// Create a provider sending its identity requests through `sender`.
    pub fn new(options: AuthOptions, sender: Arc<dyn HttpSender>) -> Self {
        Self {
            options,
            sender,
            session: RwLock::new(Session::default()),
            last_refresh: Mutex::new(None),
            cooldown: REAUTH_COOLDOWN,
        }
    }

    /// Override the minimum interval between two reauthentications.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    /// Options this provider authenticates with.
    pub fn options(&self) -> &AuthOptions {
        &self.options
    }

    /// Exchange the password for a token and service catalog.
    pub async fn authenticate(&self, ctx: &RequestContext) -> Result<()> {
        let _guard = self.last_refresh.lock().await;
        self.exchange(ctx).await
    }

    /// Authenticate again, or return `Cooldown` when the last reauthentication
    /// is more recent than the cooldown.
    pub async fn reauthenticate(&self, ctx: &RequestContext) -> Result<()> {
        let mut last_refresh = self.last_refresh.lock().await;
        if let Some(at) = *last_refresh {
            if at.elapsed() < self.cooldown {
                debug!(since = ?at.elapsed(), "reauthentication skipped, token refreshed recently");
                return Err(OpenStackError::Cooldown);
            }
        }

        self.exchange(ctx).await?;
        *last_refresh = Some(Instant::now());
        Ok(())
    }

    /// Current token, empty before the first authentication.
    pub fn get_token(&self) -> String {
        self.session.read().credential.value.clone()
    }

    /// Public endpoint of `service`, or an empty string when unknown.
    pub fn get_endpoint(&self, service: &str) -> String {
        self.session.read().catalog.get(service).unwrap_or_default().to_string()
    }

    /// Snapshot of the current credential.
    pub fn credential(&self) -> Credential {
        self.session.read().credential.clone()
    }

    /// Id of the project the token is scoped to.
    pub fn project_id(&self) -> String {
        self.session.read().credential.scope_id.clone()
    }

    /// Expiry reported by keystone for the current token.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.session.read().credential.expires_at
    }

    /// One password exchange. Callers hold `last_refresh`.
    async fn exchange(&self, ctx: &RequestContext) -> Result<()> {
        let payload = serde_json::to_vec(&AuthRequest::password_scoped(&self.options))
            .map_err(|err| OpenStackError::InvalidRequest(format!("identity payload: {err}")))?;

        debug!(endpoint = %self.options.endpoint, project = %self.options.tenant_name, "requesting keystone token");
        let response = self
            .sender
            .send(ctx, Method::POST, &self.options.endpoint, Some(payload))
            .await
            .map_err(|err| {
                warn!(error = %err, "keystone authentication failed");
                if err.is_permanent() {
                    err
                } else {
                    OpenStackError::Auth(err.to_string())
                }
            })?;

        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| OpenStackError::Decode(format!("missing {SUBJECT_TOKEN_HEADER} header")))?;

        let body = response.bytes().await.map_err(|err| OpenStackError::from(InfraError::from(err)))?;
        let issued: TokenResponse =
            serde_json::from_slice(&body).map_err(|err| OpenStackError::from(InfraError::from(err)))?;

        let credential = Credential::new(token, issued.token.expires_at, issued.token.project.id);
        let catalog = EndpointCatalog::from_services(&issued.token.catalog);
        info!(
            project_id = %credential.scope_id,
            expires_at = %issued.token.expires_at,
            services = catalog.len(),
            "keystone token issued"
        );

        *self.session.write() = Session { credential, catalog };
        Ok(())
    }
}

#[async_trait]
impl TokenSource for Keystone {
    fn token(&self) -> String {
        self.get_token()
    }

    async fn refresh(&self, ctx: &RequestContext) -> Result<()> {
        self.reauthenticate(ctx).await
    }
}

#[async_trait]
impl CredentialProvider for Keystone {
    async fn authenticate(&self, ctx: &RequestContext) -> Result<()> {
        Keystone::authenticate(self, ctx).await
    }

    async fn reauthenticate(&self, ctx: &RequestContext) -> Result<()> {
        Keystone::reauthenticate(self, ctx).await
    }

    fn endpoint(&self, service: &str) -> String {
        self.get_endpoint(service)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::http::RequestExecutor;

    fn token_body(server: &MockServer) -> serde_json::Value {
        json!({
            "token": {
                "expires_at": "2030-01-01T00:00:00.000000Z",
                "project": { "id": "proj-42", "name": "demo" },
                "catalog": [
                    {
                        "name": "cinderv3",
                        "type": "volumev3",
                        "endpoints": [
                            { "interface": "internal", "url": "http://internal/volume" },
                            { "interface": "public", "url": format!("{}/volume/v3", server.uri()) }
                        ]
                    },
                    {
                        "name": "nova",
                        "type": "compute",
                        "endpoints": [ { "interface": "admin", "url": "http://admin/compute" } ]
                    }
                ]
            }
        })
    }

    fn issued(server: &MockServer, token: &str) -> ResponseTemplate {
        ResponseTemplate::new(201)
            .insert_header("X-Subject-Token", token)
            .set_body_json(token_body(server))
    }

    fn keystone(server: &MockServer) -> Keystone {
        let executor = RequestExecutor::new().expect("executor");
        executor.set_retry_delay(Duration::from_millis(5));
        let options = AuthOptions::new("demo", "default", "s3cret", format!("{}/v3/auth/tokens", server.uri()));
        Keystone::new(options, Arc::new(executor))
    }

    #[tokio::test]
    async fn authenticate_stores_token_and_public_catalog() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .and(body_partial_json(json!({
                "auth": {
                    "identity": {
                        "methods": ["password"],
                        "password": { "user": { "name": "demo", "password": "s3cret" } }
                    },
                    "scope": { "project": { "name": "demo" } }
                }
            })))
            .respond_with(issued(&server, "tok-1"))
            .expect(1)
            .mount(&server)
            .await;

        let keystone = keystone(&server);
        assert_eq!(keystone.get_token(), "");

        keystone.authenticate(&RequestContext::background()).await.unwrap();

        assert_eq!(keystone.get_token(), "tok-1");
        assert_eq!(keystone.project_id(), "proj-42");
        assert_eq!(keystone.get_endpoint("cinderv3"), format!("{}/volume/v3", server.uri()));
        assert_eq!(keystone.get_endpoint("nova"), "");
        assert_eq!(keystone.get_endpoint("glance"), "");
        assert!(keystone.expires_at().is_some());
    }

    #[tokio::test]
    async fn failed_authentication_keeps_previous_state() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(issued(&server, "tok-1"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
            .mount(&server)
            .await;

        let keystone = keystone(&server);
        let ctx = RequestContext::background();
        keystone.authenticate(&ctx).await.unwrap();

        let err = keystone.authenticate(&ctx).await.unwrap_err();
        match err {
            OpenStackError::Auth(msg) => assert!(msg.contains("bad credentials")),
            other => panic!("expected auth error, got {other:?}"),
        }
        assert_eq!(keystone.get_token(), "tok-1");
        assert!(!keystone.get_endpoint("cinderv3").is_empty());
    }

    #[tokio::test]
    async fn missing_subject_token_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(token_body(&server)))
            .expect(1)
            .mount(&server)
            .await;

        let keystone = keystone(&server);
        let err = keystone.authenticate(&RequestContext::background()).await.unwrap_err();

        assert!(matches!(err, OpenStackError::Decode(_)));
        assert_eq!(keystone.get_token(), "");
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(201).insert_header("X-Subject-Token", "tok").set_body_string("{not json"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let keystone = keystone(&server);
        let err = keystone.authenticate(&RequestContext::background()).await.unwrap_err();
        assert!(matches!(err, OpenStackError::Decode(_)));
    }

    #[tokio::test]
    async fn reauthenticate_respects_cooldown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(issued(&server, "tok-2"))
            .expect(2)
            .mount(&server)
            .await;

        let keystone = keystone(&server);
        let ctx = RequestContext::background();
        keystone.authenticate(&ctx).await.unwrap();

        keystone.reauthenticate(&ctx).await.unwrap();
        let err = keystone.reauthenticate(&ctx).await.unwrap_err();

        assert_eq!(err, OpenStackError::Cooldown);
    }

    #[tokio::test]
    async fn zero_cooldown_allows_back_to_back_refreshes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(issued(&server, "tok"))
            .expect(2)
            .mount(&server)
            .await;

        let keystone = keystone(&server).with_cooldown(Duration::ZERO);
        let ctx = RequestContext::background();
        keystone.reauthenticate(&ctx).await.unwrap();
        keystone.reauthenticate(&ctx).await.unwrap();
    }

    /// Validates that concurrent rejections cause a single refresh.
    ///
    /// Assertions:
    /// - keystone sees the initial exchange plus exactly one refresh
    /// - every caller eventually succeeds with the refreshed token
    #[tokio::test]
    async fn concurrent_rejections_refresh_once() {
        let server = MockServer::start().await;
        let issued_count = Arc::new(AtomicUsize::new(0));
        let counter = issued_count.clone();
        let catalog = token_body(&server);
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                ResponseTemplate::new(201)
                    .insert_header("X-Subject-Token", format!("tok-{n}").as_str())
                    .set_body_json(catalog.clone())
            })
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/volume/v3/ping"))
            .and(wiremock::matchers::header("x-auth-token", "tok-0"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/volume/v3/ping"))
            .and(wiremock::matchers::header("x-auth-token", "tok-1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let executor = Arc::new(RequestExecutor::new().expect("executor"));
        executor.set_retry_delay(Duration::from_millis(10));
        let options = AuthOptions::new("demo", "default", "pw", format!("{}/v3/auth/tokens", server.uri()));
        let keystone = Arc::new(Keystone::new(options, executor.clone()));
        let client = crate::http::HttpClient::new(executor, keystone.clone());

        let ctx = RequestContext::background();
        client.authenticate(&ctx).await.unwrap();
        let url = format!("{}/ping", client.get_endpoint("cinderv3"));

        let calls = (0..4).map(|_| {
            let client = client.clone();
            let url = url.clone();
            tokio::spawn(async move {
                client.do_auth_request(&RequestContext::background(), Method::GET, &url, None).await
            })
        });
        for call in calls.collect::<Vec<_>>() {
            let response = call.await.unwrap().expect("call succeeds after refresh");
            assert_eq!(response.status(), 200);
        }

        assert_eq!(issued_count.load(Ordering::SeqCst), 2);
        assert_eq!(keystone.get_token(), "tok-1");
    }

    /// Validates that cancelling a call stuck in a slow refresh returns promptly.
    ///
    /// Assertions:
    /// - the call fails with the cancellation error
    /// - it returns long before keystone would have answered
    #[tokio::test]
    async fn cancellation_interrupts_slow_refresh() {
        let server = MockServer::start().await;
        let issued_count = Arc::new(AtomicUsize::new(0));
        let counter = issued_count.clone();
        let catalog = token_body(&server);
        Mock::given(method("POST"))
            .and(path("/v3/auth/tokens"))
            .respond_with(move |_req: &wiremock::Request| -> ResponseTemplate {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let template = ResponseTemplate::new(201)
                    .insert_header("X-Subject-Token", format!("tok-{n}").as_str())
                    .set_body_json(catalog.clone());
                if n == 0 {
                    template
                } else {
                    template.set_delay(Duration::from_secs(3))
                }
            })
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/volume/v3/ping"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let executor = Arc::new(RequestExecutor::new().expect("executor"));
        executor.set_retry_delay(Duration::from_millis(5));
        let options = AuthOptions::new("demo", "default", "pw", format!("{}/v3/auth/tokens", server.uri()));
        let keystone = Arc::new(Keystone::new(options, executor.clone()));
        let client = crate::http::HttpClient::new(executor, keystone);

        client.authenticate(&RequestContext::background()).await.unwrap();
        let url = format!("{}/ping", client.get_endpoint("cinderv3"));

        let ctx = RequestContext::background();
        let trigger = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let started = std::time::Instant::now();
        let err = client.do_auth_request(&ctx, Method::GET, &url, None).await.unwrap_err();

        assert_eq!(err, OpenStackError::Transport("request cancelled".into()));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
