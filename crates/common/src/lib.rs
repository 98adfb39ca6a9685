//! Modular common utilities shared across OSC crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: error derive support, no side effects
//! - `observability`: tracing for the runtime helpers
//! - `runtime`: async infrastructure (resilience)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "runtime")]
pub use resilience::{
    RetryConfig, RetryDecision, RetryError, RetryExecutor, RetryOutcome, RetryPolicy,
    RetryResult,
};
