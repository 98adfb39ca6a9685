//! Service clients built on the authenticated HTTP client.

pub mod cinder;

pub use cinder::Cinder;
