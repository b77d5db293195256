//! Configuration parsing and types.
//!
//! - `types` - Root config structure (`Config`) and its sections
//! - `service` - Service declarations (`ServiceConfig`, `Tier`, `ProbeSpec`)
//! - `duration` - Human-readable durations
//! - `parser` - YAML config discovery and parsing
//! - `validation` - Config validation

mod duration;
mod parser;
mod service;
mod types;
mod validation;

pub use duration::*;
pub use parser::*;
pub use service::*;
pub use types::*;
pub use validation::*;
