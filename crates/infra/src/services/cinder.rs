//! Cinder (block storage v3) client

use osc_domain::constants::CINDER_SERVICE;
use osc_domain::{OpenStackError, Result, Volume};
use reqwest::Method;
use tracing::debug;

use crate::errors::InfraError;
use crate::http::{HttpClient, RequestContext};

/// Block storage operations over an authenticated client.
#[derive(Debug, Clone)]
pub struct Cinder {
    client: HttpClient,
}

impl Cinder {
    /// Cinder client sending through `client`.
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Fetch one volume by id.
    ///
    /// # Errors
    /// `Config` when the catalog has no `cinderv3` endpoint, otherwise the
    /// error of the last attempt or `Decode` for an unexpected body.
    pub async fn get_volume(&self, ctx: &RequestContext, id: &str) -> Result<Volume> {
        let endpoint = self.client.get_endpoint(CINDER_SERVICE);
        if endpoint.is_empty() {
            return Err(OpenStackError::Config(format!(
                "no public {CINDER_SERVICE} endpoint in the service catalog"
            )));
        }

        let url = format!("{}/volumes/{}", endpoint.trim_end_matches('/'), urlencoding::encode(id));
        let response = self
            .client
            .new_request(Method::GET, url, None)
            .context(ctx.clone())
            .query_kv("limit", "1")
            .query_kv("all_tenants", "1")
            .metadata("cinder", "get_volume")
            .send()
            .await?;

        let body = response.bytes().await.map_err(|err| OpenStackError::from(InfraError::from(err)))?;
        let volume: Volume =
            serde_json::from_slice(&body).map_err(|err| OpenStackError::from(InfraError::from(err)))?;
        debug!(volume_id = id, status = %volume.volume.status, "volume fetched");
        Ok(volume)
    }
}
