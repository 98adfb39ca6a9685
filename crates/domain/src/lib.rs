//! # OSC Domain
//!
//! Domain types and models for the OpenStack client.
//!
//! This crate contains:
//! - Credential and endpoint catalog state
//! - Identity (keystone) and volume (cinder) payloads
//! - The error taxonomy and `Result` alias
//! - Configuration structures and constants
//!
//! ## Architecture
//! - No dependencies on other OSC crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
