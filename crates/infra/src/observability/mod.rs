//! Observability bootstrap
//!
//! The client emits `tracing` events and one span per HTTP attempt. This
//! module installs a subscriber for binaries and tests that want them printed.

pub mod logging;

pub use logging::{build_filter, init_tracing};
