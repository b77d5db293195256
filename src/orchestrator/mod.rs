mod builder;
mod core;
mod stop;
mod verify;

pub use builder::OrchestratorBuilder;
pub use self::core::*;
pub use stop::{PortCheck, StopReport};
pub use verify::StartReport;
