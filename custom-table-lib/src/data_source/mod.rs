//! Data loading through a host-supplied request function.

mod controller;
mod request;
mod retry;

pub use controller::*;
pub use request::*;
pub use retry::*;
