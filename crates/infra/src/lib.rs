//! # OSC Infrastructure
//!
//! Impure side of the OpenStack client.
//!
//! This crate contains:
//! - The HTTP execution core (retry, per-attempt tracing, response
//!   classification, credential injection and refresh)
//! - The fluent request builder
//! - The keystone credential provider
//! - Service clients (cinder)
//! - Configuration loading and logging bootstrap
//!
//! ## Architecture
//! - Domain types and errors come from `osc-domain`
//! - Retry execution comes from `osc-common`
//! - The credential provider and the execution core only know each other
//!   through [`TokenSource`] and [`HttpSender`]

pub mod config;
pub mod errors;
pub mod http;
pub mod identity;
pub mod observability;
pub mod openstack;
pub mod services;

// Re-export commonly used items
pub use errors::InfraError;
pub use http::{
    ClientConfig, HttpClient, HttpSender, Request, RequestContext, RequestExecutor,
    TokenSource, TraceMetadata,
};
pub use identity::{CredentialProvider, Keystone};
pub use openstack::OpenStack;
pub use services::Cinder;
