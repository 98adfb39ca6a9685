//! Error types used throughout the client

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad classification used by retry policies and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No response was obtained (connect failure, timeout, cancellation)
    Network,
    /// 5xx responses
    Server,
    /// 4xx responses other than authentication failures
    Client,
    /// Credential rejected, refresh contention or identity exchange failures
    Authentication,
    /// Malformed response bodies or headers
    Decode,
    /// Failures that no retry can fix (malformed request, bad configuration)
    Permanent,
}

/// Main error type for the OpenStack client
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum OpenStackError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Code {code}  {body}")]
    HttpStatus { code: u16, body: String },

    #[error("Access denied, token expired (HTTP {code})")]
    AuthExpired { code: u16 },

    #[error("Another task is refreshing the token")]
    ConcurrentRefresh,

    #[error("Token was updated less than a minute ago")]
    Cooldown,

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl OpenStackError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Transport(_) => ErrorCategory::Network,
            Self::HttpStatus { code, .. } if *code >= 500 => ErrorCategory::Server,
            Self::HttpStatus { .. } => ErrorCategory::Client,
            Self::AuthExpired { .. } | Self::ConcurrentRefresh | Self::Cooldown | Self::Auth(_) => {
                ErrorCategory::Authentication
            }
            Self::Decode(_) => ErrorCategory::Decode,
            Self::InvalidRequest(_) | Self::Config(_) => ErrorCategory::Permanent,
        }
    }

    /// Whether retrying the same call can never succeed.
    pub fn is_permanent(&self) -> bool {
        self.category() == ErrorCategory::Permanent
    }

    /// HTTP status carried by the error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { code, .. } | Self::AuthExpired { code } => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, OpenStackError>;
