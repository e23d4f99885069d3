//! Plugins shipped with the table.

mod drag_sort;
mod fetch_status;
mod load_more;
mod pagination;
mod row_selection;
mod smart_cell;

pub use drag_sort::*;
pub use fetch_status::*;
pub use load_more::*;
pub use pagination::*;
pub use row_selection::*;
pub use smart_cell::*;
