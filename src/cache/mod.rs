//! Cache Module
//!
//! Public cache facade over a pluggable driver, with optional single-flight
//! suppression of concurrent misses.

mod facade;
mod flight;


// Re-export public types
pub use facade::{Cache, FOREVER};
pub use flight::{FlightGroup, FlightGuard};
