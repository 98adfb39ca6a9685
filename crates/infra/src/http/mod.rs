//! HTTP execution core
//!
//! ```text
//!  caller ──► Request (builder) ─┐
//!        └──► HttpClient ────────┴──► executor::execute
//!                                         │  RetryExecutor (osc-common)
//!                                         ▼
//!                                  [span ► send ► classify]  per attempt
//!                                         │ 401/403
//!                                         ▼
//!                                    TokenSource::refresh
//! ```
//!
//! Both entry points end in the same routine, so the direct and builder
//! paths share one retry, tracing and classification implementation.

pub mod client;
pub mod context;
pub mod executor;
pub mod request;
pub mod trace;
pub mod traits;

pub use client::HttpClient;
pub use context::RequestContext;
pub use executor::{default_retry_policy, default_transport, ClientConfig, RequestExecutor, SharedRetryPolicy};
pub use request::Request;
pub use trace::TraceMetadata;
pub use traits::{HttpSender, TokenSource};
