//! Entry point wiring the executor, keystone and service clients together.

use std::sync::Arc;

use osc_domain::{AuthOptions, ClientSettings, Result};
use tracing::info;

use crate::http::{ClientConfig, HttpClient, RequestContext, RequestExecutor};
use crate::identity::Keystone;
use crate::services::Cinder;

/// An OpenStack cloud reachable with one set of credentials.
///
/// Keystone sends its identity requests through the same executor as the
/// client, so retry and timeout settings apply to both.
#[derive(Debug, Clone)]
pub struct OpenStack {
    client: HttpClient,
    keystone: Arc<Keystone>,
}

impl OpenStack {
    /// Client with default HTTP settings authenticating with `options`.
    pub fn new(options: AuthOptions) -> Result<Self> {
        Ok(Self::with_executor(options, Arc::new(RequestExecutor::new()?)))
    }

    /// Build from loaded settings, applying the HTTP overrides.
    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        settings.validate()?;
        let mut config = ClientConfig::new()?;
        config.timeout = settings.http.timeout();
        config.max_retries = settings.http.max_retries;
        config.retry_delay = settings.http.retry_delay();

        let executor = Arc::new(RequestExecutor::with_config(config));
        Ok(Self::with_executor(settings.identity.to_auth_options(), executor))
    }

    fn with_executor(options: AuthOptions, executor: Arc<RequestExecutor>) -> Self {
        info!(endpoint = %options.endpoint, project = %options.tenant_name, "creating OpenStack client");
        let keystone = Arc::new(Keystone::new(options, executor.clone()));
        let client = HttpClient::new(executor, keystone.clone());
        Self { client, keystone }
    }

    /// Perform the initial keystone authentication.
    pub async fn authenticate(&self, ctx: &RequestContext) -> Result<()> {
        self.keystone.authenticate(ctx).await
    }

    /// Authenticated client shared by every service.
    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Credential provider behind the client.
    pub fn keystone(&self) -> &Arc<Keystone> {
        &self.keystone
    }

    /// Block storage client over the shared HTTP client.
    pub fn cinder(&self) -> Cinder {
        Cinder::new(self.client.clone())
    }
}
