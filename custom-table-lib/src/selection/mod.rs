//! Row selection and batch actions.

mod batch;
mod cache;
mod config;
mod engine;

pub use batch::*;
pub use cache::*;
pub use config::*;
pub use engine::*;
