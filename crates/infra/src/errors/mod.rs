//! Error conversions owned by the infrastructure layer

mod conversions;

pub use conversions::InfraError;
