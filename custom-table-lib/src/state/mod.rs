//! Table state, commands and the state store.

mod command;
mod pagination;
mod store;
mod table_state;

pub use command::*;
pub use pagination::*;
pub use store::*;
pub use table_state::*;
