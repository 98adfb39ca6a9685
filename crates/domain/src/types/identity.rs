//! Keystone v3 identity payloads
//!
//! Request bodies sent to `POST /v3/auth/tokens` and the subset of the token
//! response the client consumes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::PASSWORD_METHOD;

/// Caller-supplied options for a project-scoped password authentication.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthOptions {
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,
    pub tenant_name: String,
    pub domain: String,
    #[serde(skip_serializing)]
    pub password: String,
    /// Identity endpoint, e.g. `https://keystone.example.com/v3/auth/tokens`.
    pub endpoint: String,
    /// User name; the tenant name is used when absent.
    #[serde(default)]
    pub username: Option<String>,
}

fn default_methods() -> Vec<String> {
    vec![PASSWORD_METHOD.to_string()]
}

impl AuthOptions {
    pub fn new(
        tenant_name: impl Into<String>,
        domain: impl Into<String>,
        password: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            methods: default_methods(),
            tenant_name: tenant_name.into(),
            domain: domain.into(),
            password: password.into(),
            endpoint: endpoint.into(),
            username: None,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_methods(mut self, methods: Vec<String>) -> Self {
        self.methods = methods;
        self
    }

    /// User name sent in the identity payload.
    pub fn username(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.tenant_name)
    }
}

impl fmt::Debug for AuthOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthOptions")
            .field("methods", &self.methods)
            .field("tenant_name", &self.tenant_name)
            .field("domain", &self.domain)
            .field("password", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .field("username", &self.username)
            .finish()
    }
}

/// Top-level `{"auth": …}` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub auth: AuthScoped,
}

impl AuthRequest {
    /// Password authentication scoped to the tenant's project.
    pub fn password_scoped(options: &AuthOptions) -> Self {
        let domain = DomainRef { id: options.domain.clone() };
        Self {
            auth: AuthScoped {
                identity: Identity {
                    methods: options.methods.clone(),
                    password: PasswordMethod {
                        user: UserCredentials {
                            name: options.username().to_string(),
                            domain: domain.clone(),
                            password: options.password.clone(),
                        },
                    },
                },
                scope: Scope {
                    project: ProjectRef { domain, name: options.tenant_name.clone() },
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthScoped {
    pub identity: Identity,
    pub scope: Scope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub methods: Vec<String>,
    pub password: PasswordMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordMethod {
    pub user: UserCredentials,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCredentials {
    pub name: String,
    pub domain: DomainRef,
    pub password: String,
}

impl fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCredentials")
            .field("name", &self.name)
            .field("domain", &self.domain)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainRef {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub project: ProjectRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub domain: DomainRef,
    pub name: String,
}

/// Body of a successful token issue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub token: TokenBody,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenBody {
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub project: TokenProject,
    #[serde(default)]
    pub catalog: Vec<CatalogService>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TokenProject {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// One service of the token catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogService {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub service_type: Option<String>,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEndpoint {
    #[serde(default)]
    pub id: String,
    pub url: String,
    pub interface: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_id: Option<String>,
}
