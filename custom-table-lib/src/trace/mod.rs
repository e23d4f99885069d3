//! Structured tracing for table diagnostics.

mod collector;
mod entry;
mod sink;

pub use collector::*;
pub use entry::*;
pub use sink::*;
