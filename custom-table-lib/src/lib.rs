//! Pluggable data table core
//!
//! Headless state and behavior for a data grid: request-driven fetching with
//! pagination or streaming increments, row selection with batch actions,
//! empty-value aware cell resolution and a plugin system that renders into
//! named slots. Rendering produces a [`plugin::RenderNode`] tree; drawing it
//! is left to the host.
//!
//! ```no_run
//! use custom_table_lib::TableController;
//! use custom_table_lib::data_source::FetchResponse;
//! use custom_table_lib::data_source::RequestParams;
//! use custom_table_lib::error::RequestError;
//! use custom_table_lib::model::Record;
//!
//! # async fn run() {
//! let table = TableController::builder(|params: RequestParams| async move {
//!     let page = params.current().unwrap_or(1);
//!     let rows = vec![Record::new().set("id", page).set("name", "Ada")];
//!     Ok::<_, RequestError>(FetchResponse::page(rows, 1))
//! })
//! .with_default_plugins()
//! .build()
//! .expect("valid table");
//!
//! table.mount().await;
//! assert_eq!(table.state().data().len(), 1);
//! # }
//! ```

pub mod config;
pub mod data_source;
pub mod error;
pub mod export;
pub mod model;
pub mod plugin;
pub mod selection;
pub mod smart_cell;
pub mod state;
pub mod trace;
pub mod url_state;

mod controller;
mod panic;

pub use config::TableConfig;
pub use controller::*;
