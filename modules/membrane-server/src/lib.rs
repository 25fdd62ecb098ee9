pub mod child;
pub mod error;
pub mod forwarder;
pub mod lifecycle;
pub mod membrane;
pub mod resources;

pub use error::{MembraneError, Result};
pub use forwarder::ChildForwarder;
pub use lifecycle::{ExitReason, TerminationSignals};
pub use membrane::{Membrane, MembraneOptions, MembraneState};
