//! Reserved ports: the static registry and live availability checks.

pub mod availability;
pub mod registry;

pub use availability::{check_bind, BindCheck};
pub use registry::{PortRegistry, ServicePort};
