//! Structured logging with tracing

use osc_domain::{LoggingSettings, OpenStackError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Filter from `RUST_LOG` when set, otherwise from the configured level.
///
/// # Errors
/// Returns `OpenStackError::Config` if the configured directive is invalid.
pub fn build_filter(settings: &LoggingSettings) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&settings.level)
        .map_err(|e| OpenStackError::Config(format!("Invalid log level '{}': {}", settings.level, e)))
}

/// Install the global subscriber.
///
/// # Errors
/// Returns `OpenStackError::Config` if the filter is invalid or a global
/// subscriber is already installed.
pub fn init_tracing(settings: &LoggingSettings) -> Result<()> {
    let filter = build_filter(settings)?;
    let registry = Registry::default().with(filter);

    // The layer types differ, hence the two branches.
    let installed = if settings.json {
        registry.with(fmt::layer().json().with_target(true).with_current_span(true)).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    installed.map_err(|e| OpenStackError::Config(format!("Failed to install tracing subscriber: {}", e)))?;
    tracing::debug!(level = %settings.level, json = settings.json, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_rejects_garbage() {
        std::env::remove_var("RUST_LOG");
        let settings = LoggingSettings { level: "osc_infra=verbose".into(), json: false };
        assert!(matches!(build_filter(&settings), Err(OpenStackError::Config(_))));
    }

    #[test]
    fn test_build_filter_accepts_directives() {
        std::env::remove_var("RUST_LOG");
        let settings = LoggingSettings { level: "warn,osc_infra=debug".into(), json: false };
        assert!(build_filter(&settings).is_ok());
    }

    #[test]
    fn test_second_init_fails() {
        let settings = LoggingSettings { level: "info".into(), json: true };
        // Another test binary may already own the global subscriber.
        let _ = init_tracing(&settings);
        assert!(matches!(init_tracing(&settings), Err(OpenStackError::Config(_))));
    }
}
