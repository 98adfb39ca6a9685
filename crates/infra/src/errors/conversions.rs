//! Conversions from external infrastructure errors into domain errors.

use osc_domain::OpenStackError;
use reqwest::Error as HttpError;
use serde_json::Error as JsonError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub OpenStackError);

impl From<InfraError> for OpenStackError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<OpenStackError> for InfraError {
    fn from(value: OpenStackError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoOpenStackError {
    fn into_openstack(self) -> OpenStackError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → OpenStackError */
/* -------------------------------------------------------------------------- */

impl IntoOpenStackError for HttpError {
    fn into_openstack(self) -> OpenStackError {
        if self.is_timeout() {
            return OpenStackError::Transport("HTTP request timed out".into());
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return OpenStackError::Transport(format!("HTTP connection failure: {self}"));
        }

        if self.is_builder() {
            return OpenStackError::InvalidRequest(self.to_string());
        }

        if self.is_decode() {
            return OpenStackError::Decode(self.to_string());
        }

        if let Some(status) = self.status() {
            return OpenStackError::HttpStatus {
                code: status.as_u16(),
                body: status.canonical_reason().unwrap_or("unknown status").to_string(),
            };
        }

        OpenStackError::Transport(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_openstack())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json::Error → OpenStackError */
/* -------------------------------------------------------------------------- */

impl IntoOpenStackError for JsonError {
    fn into_openstack(self) -> OpenStackError {
        OpenStackError::Decode(format!("invalid JSON at line {} column {}: {self}", self.line(), self.column()))
    }
}

impl From<JsonError> for InfraError {
    fn from(value: JsonError) -> Self {
        InfraError(value.into_openstack())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
