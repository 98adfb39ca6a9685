//! Authenticated HTTP client
//!
//! [`HttpClient`] pairs the shared [`RequestExecutor`] with a credential
//! provider. Clones share both, so one client can be handed to many tasks.

use std::sync::Arc;
use std::time::Duration;

use osc_domain::Result;
use reqwest::{Client as ReqwestClient, Method, Response};

use super::context::RequestContext;
use super::executor::{RequestExecutor, SharedRetryPolicy};
use super::request::{ClientSnapshot, Request};
use super::traits::TokenSource;
use crate::identity::CredentialProvider;

#[derive(Clone)]
pub struct HttpClient {
    executor: Arc<RequestExecutor>,
    tokens: Arc<dyn TokenSource>,
    credentials: Arc<dyn CredentialProvider>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient").field("executor", &self.executor).finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Build a client over `executor` authenticating through `provider`.
    ///
    /// The provider usually sends its own identity requests through the same
    /// executor, so retry settings apply to authentication as well.
    pub fn new<K>(executor: Arc<RequestExecutor>, provider: Arc<K>) -> Self
    where
        K: CredentialProvider + 'static,
    {
        let tokens: Arc<dyn TokenSource> = provider.clone();
        let credentials: Arc<dyn CredentialProvider> = provider;
        Self { executor, tokens, credentials }
    }

    /// Executor shared by every clone of this client.
    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }

    /// Send with `X-Auth-Token`, refreshing the token on 401/403.
    pub async fn do_auth_request(
        &self,
        ctx: &RequestContext,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Response> {
        self.executor.do_auth_request(ctx, self.tokens.as_ref(), method, url, body).await
    }

    /// Send without credentials.
    pub async fn do_request(
        &self,
        ctx: &RequestContext,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Response> {
        self.executor.do_request(ctx, method, url, body).await
    }

    /// Start a fluent request carrying a copy of the current settings.
    pub fn new_request(&self, method: Method, url: impl Into<String>, body: Option<Vec<u8>>) -> Request {
        Request::new(self.snapshot(), method, url, body)
    }

    fn snapshot(&self) -> ClientSnapshot {
        ClientSnapshot {
            timeout: self.executor.timeout(),
            max_retries: self.executor.max_retries(),
            retry_delay: self.executor.retry_delay(),
            policy: self.executor.retry_policy(),
            tokens: Arc::clone(&self.tokens),
        }
    }

    /// Replace the transport used by direct calls. Builders pick their own.
    pub fn set_transport(&self, transport: ReqwestClient) {
        self.executor.set_transport(transport);
    }

    /// Clone of the transport used by direct calls.
    pub fn transport(&self) -> ReqwestClient {
        self.executor.transport()
    }

    /// Set the per-attempt timeout; zero disables it.
    pub fn set_timeout(&self, timeout: Duration) {
        self.executor.set_timeout(timeout);
    }

    /// Current per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        self.executor.timeout()
    }

    /// Set the attempt budget per logical call.
    pub fn set_max_retries(&self, max_retries: u32) {
        self.executor.set_max_retries(max_retries);
    }

    /// Current attempt budget.
    pub fn max_retries(&self) -> u32 {
        self.executor.max_retries()
    }

    /// Set the constant pause between attempts.
    pub fn set_retry_delay(&self, delay: Duration) {
        self.executor.set_retry_delay(delay);
    }

    /// Current pause between attempts.
    pub fn retry_delay(&self) -> Duration {
        self.executor.retry_delay()
    }

    /// Replace the predicate deciding which failures are retried.
    pub fn set_retry_policy(&self, policy: SharedRetryPolicy) {
        self.executor.set_retry_policy(policy);
    }

    /// Current retry predicate.
    pub fn retry_policy(&self) -> SharedRetryPolicy {
        self.executor.retry_policy()
    }

    /// Initial authentication through the credential provider.
    pub async fn authenticate(&self, ctx: &RequestContext) -> Result<()> {
        self.credentials.authenticate(ctx).await
    }

    /// Forced reauthentication through the credential provider.
    pub async fn reauthenticate(&self, ctx: &RequestContext) -> Result<()> {
        self.credentials.reauthenticate(ctx).await
    }

    /// Current token.
    pub fn get_token(&self) -> String {
        self.tokens.token()
    }

    /// Public endpoint of `service`, or an empty string when unknown.
    pub fn get_endpoint(&self, service: &str) -> String {
        self.credentials.endpoint(service)
    }
}
