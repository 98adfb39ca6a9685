//! Client constants
//!
//! Centralized location for the wire-level names and defaults shared by the
//! request execution layer and the service clients.

use std::time::Duration;

// Header names
pub const AUTH_HEADER: &str = "X-Auth-Token";
pub const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";
pub const CONTENT_TYPE_JSON: &str = "application/json";

// Retry and timeout defaults
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Minimum time between two reauthentications.
pub const REAUTH_COOLDOWN: Duration = Duration::from_secs(60);

// Catalog
pub const PUBLIC_INTERFACE: &str = "public";
pub const CINDER_SERVICE: &str = "cinderv3";
pub const PASSWORD_METHOD: &str = "password";
