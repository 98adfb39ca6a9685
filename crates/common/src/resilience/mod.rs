//! Resilience patterns for fault tolerance and error handling
//!
//! This module provides a **generic, reusable** retry executor:
//! - constant delay between attempts (no exponential growth, no jitter)
//! - a pluggable [`RetryPolicy`] deciding which errors are worth another
//!   attempt
//! - cooperative cancellation through `tokio_util`'s `CancellationToken`,
//!   observed before each attempt and while sleeping
//!
//! The executor never wraps or rewrites the error produced by the operation:
//! every terminal [`RetryError`] variant carries the last error as-is so the
//! caller can surface it unchanged.

pub mod retry;

pub use retry::{
    policies, RetryConfig, RetryDecision, RetryError, RetryExecutor, RetryOutcome, RetryPolicy,
    RetryResult,
};
