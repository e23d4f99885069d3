//! Empty-value aware cell rendering.

mod config;
mod context;
mod empty;
mod resolver;

pub use config::*;
pub use context::*;
pub use empty::*;
pub use resolver::*;
