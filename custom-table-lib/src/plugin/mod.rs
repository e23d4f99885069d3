//! Plugin system: typed slots, lifecycle management and built-in plugins.

pub mod builtin;

mod context;
mod manager;
mod metrics;
mod node;
mod traits;

pub use context::*;
pub use manager::*;
pub use metrics::MetricsSnapshot;
pub use node::*;
pub use traits::*;
