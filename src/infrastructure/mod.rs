//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements I/O boundary traits and wires up services.

pub mod chart;
pub mod di;
pub mod error;
pub mod geojson;
pub mod http;
pub mod traits;

pub use error::{InfraError, InfraResult};
