//! Configuration loader
//!
//! Loads client settings from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If the identity variables are incomplete, falls back to a file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `OS_AUTH_URL`: Keystone token endpoint (required)
//! - `OS_PROJECT_NAME`: Project to scope the token to (required)
//! - `OS_PASSWORD`: Password (required)
//! - `OS_USERNAME`: User name, defaults to the project name
//! - `OS_DOMAIN_ID`: User and project domain
//! - `OSC_HTTP_TIMEOUT_MS`: Per-attempt timeout in milliseconds
//! - `OSC_HTTP_MAX_RETRIES`: Attempt budget per call
//! - `OSC_HTTP_RETRY_DELAY_MS`: Pause between attempts in milliseconds
//! - `OSC_LOG_LEVEL`: Default log filter
//! - `OSC_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./osc.json` or `./osc.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use osc_domain::{
    ClientSettings, HttpSettings, IdentitySettings, LoggingSettings, OpenStackError, Result,
};

const CONFIG_NAMES: [&str; 4] = ["osc.json", "osc.toml", "config.json", "config.toml"];

/// Load settings with automatic fallback strategy
///
/// # Errors
/// Returns `OpenStackError::Config` if neither source yields valid settings.
pub fn load() -> Result<ClientSettings> {
    match load_from_env() {
        Ok(settings) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(settings)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load settings from environment variables
///
/// # Errors
/// Returns `OpenStackError::Config` if identity variables are missing or a
/// numeric variable does not parse.
pub fn load_from_env() -> Result<ClientSettings> {
    let identity = IdentitySettings {
        endpoint: env_var("OS_AUTH_URL")?,
        tenant_name: env_var("OS_PROJECT_NAME")?,
        password: env_var("OS_PASSWORD")?,
        username: std::env::var("OS_USERNAME").ok().filter(|s| !s.is_empty()),
        domain: std::env::var("OS_DOMAIN_ID").unwrap_or_default(),
    };

    let defaults = HttpSettings::default();
    let http = HttpSettings {
        timeout_ms: env_parse("OSC_HTTP_TIMEOUT_MS", defaults.timeout_ms)?,
        max_retries: env_parse("OSC_HTTP_MAX_RETRIES", defaults.max_retries)?,
        retry_delay_ms: env_parse("OSC_HTTP_RETRY_DELAY_MS", defaults.retry_delay_ms)?,
    };

    let defaults = LoggingSettings::default();
    let logging = LoggingSettings {
        level: std::env::var("OSC_LOG_LEVEL").unwrap_or(defaults.level),
        json: env_bool("OSC_LOG_JSON", defaults.json),
    };

    let settings = ClientSettings { identity, http, logging };
    settings.validate()?;
    Ok(settings)
}

/// Load settings from a file
///
/// If `path` is `None`, probes the standard locations. The format is chosen by
/// file extension.
///
/// # Errors
/// Returns `OpenStackError::Config` if no file is found, it cannot be read or
/// parsed, or the settings fail validation.
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientSettings> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(OpenStackError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            OpenStackError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| OpenStackError::Config(format!("Failed to read config file: {}", e)))?;

    let settings = parse_config(&contents, &config_path)?;
    settings.validate()?;
    Ok(settings)
}

fn parse_config(contents: &str, path: &Path) -> Result<ClientSettings> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| OpenStackError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| OpenStackError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(OpenStackError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// First existing config file in the working directory or next to the
/// executable.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        OpenStackError::Config(format!("Missing required environment variable: {}", key))
    })
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| OpenStackError::Config(format!("Invalid value for {}: {}", key, e))),
        Err(_) => Ok(default),
    }
}

/// Accepts `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
