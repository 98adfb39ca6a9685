//! Fluent request builder
//!
//! ```ignore
//! let response = client
//!     .new_request(Method::GET, format!("{endpoint}/volumes/{id}"), None)
//!     .query_kv("limit", "1")
//!     .metadata("cinder", "get_volume")
//!     .send()
//!     .await?;
//! ```
//!
//! A builder owns a copy of the client settings taken when it was created and
//! is consumed when sent. The client transport is not copied.

use std::sync::Arc;
use std::time::Duration;

use osc_common::RetryConfig;
use osc_domain::constants::{AUTH_HEADER, CONTENT_TYPE_JSON, DEFAULT_TIMEOUT};
use osc_domain::Result;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Method, Response};

use super::context::RequestContext;
use super::executor::{
    default_transport, execute, header_name, parse_url, Credentials, Dispatch, SharedRetryPolicy,
};
use super::trace::TraceMetadata;
use super::traits::TokenSource;

/// Client settings copied into a builder at construction. The transport is
/// not among them: a builder sends through a fresh default transport unless
/// one is set on it.
pub(crate) struct ClientSnapshot {
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub policy: SharedRetryPolicy,
    pub tokens: Arc<dyn TokenSource>,
}

/// A single HTTP call under construction.
#[must_use = "a request does nothing until sent"]
pub struct Request {
    method: Method,
    url: String,
    query: String,
    body: Option<Vec<u8>>,
    ctx: RequestContext,
    transport: Option<ReqwestClient>,
    auth_header: String,
    attempt_timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    request_timeout: Duration,
    policy: SharedRetryPolicy,
    trace: TraceMetadata,
    tokens: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("query", &self.query)
            .field("auth_header", &self.auth_header)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("request_timeout", &self.request_timeout)
            .field("trace", &self.trace)
            .finish_non_exhaustive()
    }
}

impl Request {
    pub(crate) fn new(
        snapshot: ClientSnapshot,
        method: Method,
        url: impl Into<String>,
        body: Option<Vec<u8>>,
    ) -> Self {
        Self {
            method,
            url: url.into(),
            query: String::new(),
            body,
            ctx: RequestContext::background(),
            transport: None,
            auth_header: AUTH_HEADER.to_string(),
            attempt_timeout: snapshot.timeout,
            max_retries: snapshot.max_retries,
            retry_delay: snapshot.retry_delay,
            request_timeout: DEFAULT_TIMEOUT,
            policy: snapshot.policy,
            trace: TraceMetadata::default(),
            tokens: snapshot.tokens,
        }
    }

    /// Append `key=value`, both URL-encoded.
    pub fn query_kv(mut self, key: &str, value: &str) -> Self {
        let pair = format!("{}={}", urlencoding::encode(key), urlencoding::encode(value));
        self.append_query(&pair);
        self
    }

    /// Append a raw query string. A leading `?` or `&` is dropped and
    /// strings of at most one character are ignored.
    pub fn query_string(mut self, query: &str) -> Self {
        if query.len() <= 1 {
            return self;
        }
        let query = query.strip_prefix(['?', '&']).unwrap_or(query);
        self.append_query(query);
        self
    }

    fn append_query(&mut self, part: &str) {
        self.query.push(if self.query.is_empty() { '?' } else { '&' });
        self.query.push_str(part);
    }

    /// Run under `ctx` for cancellation and deadline.
    pub fn context(mut self, ctx: RequestContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Send through `transport` instead of a fresh default one.
    pub fn transport(mut self, transport: ReqwestClient) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Header carrying the token on authenticated sends.
    pub fn auth_header(mut self, name: impl Into<String>) -> Self {
        self.auth_header = name.into();
        self
    }

    /// Attempt budget for this call; zero still makes one attempt.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Constant pause between attempts of this call.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Deadline for the whole call, retries and delays included. Zero disables it.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Component and operation names recorded on each attempt span.
    pub fn metadata(mut self, component: impl Into<String>, operation: impl Into<String>) -> Self {
        self.trace = TraceMetadata::new(component, operation);
        self
    }

    /// Query string as it will be sent, including the leading `?`.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Target URL with the query appended.
    pub fn full_url(&self) -> String {
        format!("{}{}", self.url, self.query)
    }

    /// Send with the token in the configured auth header.
    pub async fn send(self) -> Result<Response> {
        let header = header_name(&self.auth_header)?;
        let tokens = Arc::clone(&self.tokens);
        let (ctx, dispatch) = self.into_dispatch()?;
        execute(&ctx, dispatch, Credentials::Token { source: tokens.as_ref(), header }).await
    }

    /// Send without credentials.
    pub async fn send_non_auth(self) -> Result<Response> {
        let (ctx, dispatch) = self.into_dispatch()?;
        execute(&ctx, dispatch, Credentials::None).await
    }

    fn into_dispatch(self) -> Result<(RequestContext, Dispatch)> {
        let url = parse_url(&self.full_url())?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON));

        let ctx = if self.request_timeout.is_zero() {
            self.ctx
        } else {
            self.ctx.with_timeout(self.request_timeout)
        };

        let dispatch = Dispatch {
            method: self.method,
            url,
            headers,
            body: self.body,
            transport,
            attempt_timeout: self.attempt_timeout,
            retry: RetryConfig::constant(self.max_retries, self.retry_delay),
            policy: self.policy,
            trace: self.trace,
        };
        Ok((ctx, dispatch))
    }
}
