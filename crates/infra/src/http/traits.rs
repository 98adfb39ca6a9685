//! Capabilities exchanged between the credential provider and the execution
//! core.
//!
//! The provider needs to send HTTP requests to authenticate and the core needs
//! tokens to authenticate requests. Each side only sees the narrow trait of the
//! other, so neither module depends on the other's concrete type.

use async_trait::async_trait;
use osc_domain::Result;
use reqwest::{Method, Response};

use super::context::RequestContext;

/// Source of bearer tokens for authenticated requests.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Current token; empty before the first successful authentication.
    fn token(&self) -> String;

    /// Obtain a new token after the current one was rejected.
    ///
    /// The refresh runs under the caller's cancellation and deadline.
    async fn refresh(&self, ctx: &RequestContext) -> Result<()>;
}

/// Unauthenticated request sender.
#[async_trait]
pub trait HttpSender: Send + Sync {
    /// Send a request without credentials, with retry and tracing.
    ///
    /// Returns the response only when its status is 2xx.
    async fn send(
        &self,
        ctx: &RequestContext,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Response>;
}
