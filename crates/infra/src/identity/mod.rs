//! Identity providers
//!
//! A [`CredentialProvider`] issues the token attached to authenticated calls
//! and resolves service endpoints from the catalog returned with it.

pub mod keystone;

use async_trait::async_trait;
use osc_domain::Result;

use crate::http::{RequestContext, TokenSource};

pub use keystone::Keystone;

#[async_trait]
pub trait CredentialProvider: TokenSource {
    /// Obtain a token and endpoint catalog, replacing any previous one.
    async fn authenticate(&self, ctx: &RequestContext) -> Result<()>;

    /// Replace a rejected token. Fails with `Cooldown` when a refresh happened
    /// too recently.
    async fn reauthenticate(&self, ctx: &RequestContext) -> Result<()>;

    /// Public endpoint of the named service, or an empty string.
    fn endpoint(&self, service: &str) -> String;
}
