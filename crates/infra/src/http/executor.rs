//! Request execution: retry, per-attempt tracing and response classification.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use osc_common::resilience::policies::PredicateRetry;
use osc_common::{RetryConfig, RetryExecutor, RetryPolicy};
use osc_domain::constants::{
    AUTH_HEADER, CONTENT_TYPE_JSON, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT,
};
use osc_domain::{OpenStackError, Result};
use parking_lot::{Mutex, RwLock};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Method, Response, StatusCode};
use tracing::{debug, Instrument};
use url::Url;

use super::context::RequestContext;
use super::trace::{self, TraceMetadata};
use super::traits::{HttpSender, TokenSource};
use crate::errors::InfraError;

/// Retry policy shared by every call of a client.
pub type SharedRetryPolicy = Arc<dyn RetryPolicy<OpenStackError> + Send + Sync>;

/// Retry everything except errors that can never succeed.
pub fn default_retry_policy() -> SharedRetryPolicy {
    Arc::new(PredicateRetry::new(|error: &OpenStackError, _attempt: u32| !error.is_permanent()))
}

/// Fresh reqwest transport with the client defaults.
pub fn default_transport() -> Result<ReqwestClient> {
    ReqwestClient::builder().no_proxy().build().map_err(|err| InfraError::from(err).into())
}

/// Mutable settings shared by every request issued through one client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub transport: ReqwestClient,
    /// Per-attempt transport timeout; zero disables it
    pub timeout: Duration,
    /// Attempt budget for a logical call; zero still makes one attempt
    pub max_retries: u32,
    pub retry_delay: Duration,
}

impl ClientConfig {
    /// Default settings over a fresh transport.
    pub fn new() -> Result<Self> {
        Ok(Self::with_transport(default_transport()?))
    }

    /// Default settings over `transport`.
    pub fn with_transport(transport: ReqwestClient) -> Self {
        Self {
            transport,
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Executes requests with the client-wide configuration.
///
/// Each setter and getter locks the configuration for that single field only.
pub struct RequestExecutor {
    config: Mutex<ClientConfig>,
    policy: RwLock<SharedRetryPolicy>,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor").field("config", &*self.config.lock()).finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Executor with default settings and the default retry policy.
    pub fn new() -> Result<Self> {
        Ok(Self::with_config(ClientConfig::new()?))
    }

    /// Executor over `config` with the default retry policy.
    pub fn with_config(config: ClientConfig) -> Self {
        Self { config: Mutex::new(config), policy: RwLock::new(default_retry_policy()) }
    }

    /// Replace the transport used by later direct calls.
    pub fn set_transport(&self, transport: ReqwestClient) {
        self.config.lock().transport = transport;
    }

    /// Clone of the current transport.
    pub fn transport(&self) -> ReqwestClient {
        self.config.lock().transport.clone()
    }

    /// Set the per-attempt timeout; zero disables it.
    pub fn set_timeout(&self, timeout: Duration) {
        self.config.lock().timeout = timeout;
    }

    /// Current per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        self.config.lock().timeout
    }

    /// Set the attempt budget per logical call.
    pub fn set_max_retries(&self, max_retries: u32) {
        self.config.lock().max_retries = max_retries;
    }

    /// Current attempt budget.
    pub fn max_retries(&self) -> u32 {
        self.config.lock().max_retries
    }

    /// Set the constant pause between attempts.
    pub fn set_retry_delay(&self, delay: Duration) {
        self.config.lock().retry_delay = delay;
    }

    /// Current pause between attempts.
    pub fn retry_delay(&self) -> Duration {
        self.config.lock().retry_delay
    }

    /// Replace the predicate deciding which failures are retried.
    pub fn set_retry_policy(&self, policy: SharedRetryPolicy) {
        *self.policy.write() = policy;
    }

    /// Current retry predicate.
    pub fn retry_policy(&self) -> SharedRetryPolicy {
        Arc::clone(&self.policy.read())
    }

    /// Send with the current token in `X-Auth-Token`, refreshing it on
    /// 401/403.
    pub async fn do_auth_request(
        &self,
        ctx: &RequestContext,
        tokens: &dyn TokenSource,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Response> {
        let dispatch = self.dispatch_for(method, url, body)?;
        let header = header_name(AUTH_HEADER)?;
        execute(ctx, dispatch, Credentials::Token { source: tokens, header }).await
    }

    /// Send without credentials.
    pub async fn do_request(
        &self,
        ctx: &RequestContext,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Response> {
        let dispatch = self.dispatch_for(method, url, body)?;
        execute(ctx, dispatch, Credentials::None).await
    }

    fn dispatch_for(&self, method: Method, url: &str, body: Option<Vec<u8>>) -> Result<Dispatch> {
        let url = parse_url(url)?;
        let mut headers = HeaderMap::new();
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));
        }

        Ok(Dispatch {
            method,
            url,
            headers,
            body,
            transport: self.transport(),
            attempt_timeout: self.timeout(),
            retry: RetryConfig::constant(self.max_retries(), self.retry_delay()),
            policy: self.retry_policy(),
            trace: TraceMetadata::default(),
        })
    }
}

#[async_trait]
impl HttpSender for RequestExecutor {
    async fn send(
        &self,
        ctx: &RequestContext,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Response> {
        self.do_request(ctx, method, url, body).await
    }
}

pub(crate) fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| OpenStackError::InvalidRequest(format!("invalid header name '{name}'")))
}

pub(crate) fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|err| OpenStackError::InvalidRequest(format!("invalid url '{url}': {err}")))
}

/// Everything one logical call needs, resolved before the first attempt.
pub(crate) struct Dispatch {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    pub transport: ReqwestClient,
    pub attempt_timeout: Duration,
    pub retry: RetryConfig,
    pub policy: SharedRetryPolicy,
    pub trace: TraceMetadata,
}

/// Credential handling for a call.
pub(crate) enum Credentials<'a> {
    None,
    Token { source: &'a dyn TokenSource, header: HeaderName },
}

/// Run one logical call under the context's deadline.
pub(crate) async fn execute(
    ctx: &RequestContext,
    dispatch: Dispatch,
    credentials: Credentials<'_>,
) -> Result<Response> {
    match ctx.deadline() {
        Some(deadline) => {
            let started = tokio::time::Instant::now();
            match tokio::time::timeout_at(deadline, run_attempts(ctx, dispatch, credentials)).await {
                Ok(result) => result,
                Err(_) => Err(OpenStackError::Transport(format!(
                    "request deadline of {:?} exceeded",
                    deadline.saturating_duration_since(started)
                ))),
            }
        }
        None => run_attempts(ctx, dispatch, credentials).await,
    }
}

async fn run_attempts(
    ctx: &RequestContext,
    dispatch: Dispatch,
    credentials: Credentials<'_>,
) -> Result<Response> {
    let Dispatch {
        method,
        url,
        mut headers,
        body,
        transport,
        attempt_timeout,
        retry,
        policy,
        trace: metadata,
    } = dispatch;

    if let Credentials::Token { source, header } = &credentials {
        headers.insert(header.clone(), header_value(&source.token())?);
    }

    let headers = Mutex::new(headers);
    let attempts = AtomicU32::new(0);
    let executor = RetryExecutor::new(retry, policy);
    let cancel = ctx.cancellation();

    let outcome = {
        let (headers, attempts, credentials) = (&headers, &attempts, &credentials);
        let (method, url, body, transport, metadata) = (&method, &url, &body, &transport, &metadata);

        executor
            .execute_with_outcome(cancel, move || async move {
                let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                let mut request =
                    transport.request(method.clone(), url.clone()).headers(headers.lock().clone());
                if !attempt_timeout.is_zero() {
                    request = request.timeout(attempt_timeout);
                }
                if let Some(body) = body {
                    request = request.body(body.clone());
                }

                let span = trace::attempt_span(metadata, attempt, method, url);
                let result = async {
                    debug!(attempt, %method, %url, "sending HTTP request");
                    let response = tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            return Err(OpenStackError::Transport("request cancelled".into()));
                        }
                        sent = request.send() => sent.map_err(|err| OpenStackError::from(InfraError::from(err)))?,
                    };
                    debug!(attempt, %method, %url, status = %response.status(), "received HTTP response");
                    classify(ctx, response, credentials, headers).await
                }
                .instrument(span.clone())
                .await;

                trace::finish_attempt(&span, &result);
                result
            })
            .await
    };

    debug!(
        attempts = outcome.attempts,
        total_delay = ?outcome.total_delay,
        %method,
        %url,
        "HTTP call finished"
    );

    outcome.into_result().map_err(|err| {
        if err.is_cancelled() {
            return OpenStackError::Transport("request cancelled".into());
        }
        err.into_last_error()
            .unwrap_or_else(|| OpenStackError::Transport("request cancelled".into()))
    })
}

/// Turn a response into the attempt outcome.
async fn classify(
    ctx: &RequestContext,
    response: Response,
    credentials: &Credentials<'_>,
    headers: &Mutex<HeaderMap>,
) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if let Credentials::Token { source, header } = credentials {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            drop(response);
            let code = status.as_u16();
            debug!(status = code, "credential rejected, refreshing token");

            let refreshed = tokio::select! {
                biased;
                () = ctx.cancellation().cancelled() => {
                    return Err(OpenStackError::Transport("request cancelled".into()));
                }
                refreshed = source.refresh(ctx) => refreshed,
            };
            // The next attempt carries whatever token is current now, whether
            // this call or a concurrent one performed the refresh.
            let value = header_value(&source.token())?;
            headers.lock().insert(header.clone(), value);

            return Err(match refreshed {
                Ok(()) => OpenStackError::AuthExpired { code },
                Err(err) => {
                    debug!(error = %err, "token refresh skipped");
                    OpenStackError::ConcurrentRefresh
                }
            });
        }
    }

    let code = status.as_u16();
    let body = response.text().await.map_err(|err| OpenStackError::from(InfraError::from(err)))?;
    Err(OpenStackError::HttpStatus { code, body })
}

fn header_value(token: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(token)
        .map(|mut value| {
            value.set_sensitive(true);
            value
        })
        .map_err(|_| OpenStackError::InvalidRequest("token is not a valid header value".into()))
}
