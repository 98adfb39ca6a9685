//! Client configuration structures

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_TIMEOUT};
use crate::errors::{OpenStackError, Result};
use crate::types::AuthOptions;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    pub identity: IdentitySettings,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl ClientSettings {
    /// Reject settings that can never authenticate.
    pub fn validate(&self) -> Result<()> {
        if self.identity.endpoint.trim().is_empty() {
            return Err(OpenStackError::Config("identity endpoint must not be empty".into()));
        }
        if self.identity.tenant_name.trim().is_empty() {
            return Err(OpenStackError::Config("tenant name must not be empty".into()));
        }
        Ok(())
    }
}

/// Identity service configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct IdentitySettings {
    pub endpoint: String,
    pub tenant_name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(skip_serializing, default)]
    pub password: String,
}

impl fmt::Debug for IdentitySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentitySettings")
            .field("endpoint", &self.endpoint)
            .field("tenant_name", &self.tenant_name)
            .field("domain", &self.domain)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl IdentitySettings {
    pub fn to_auth_options(&self) -> AuthOptions {
        let options = AuthOptions::new(
            self.tenant_name.clone(),
            self.domain.clone(),
            self.password.clone(),
            self.endpoint.clone(),
        );
        match &self.username {
            Some(username) => options.with_username(username.clone()),
            None => options,
        }
    }
}

/// HTTP execution defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Per-attempt transport timeout in milliseconds
    pub timeout_ms: u64,
    /// Attempt budget for a logical call
    pub max_retries: u32,
    /// Constant pause between attempts in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
        }
    }
}

impl HttpSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by `RUST_LOG`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}
